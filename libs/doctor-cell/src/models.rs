use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// DURATION TIERS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationTier {
    #[serde(rename = "min15")]
    Min15,
    #[serde(rename = "min30")]
    Min30,
    #[serde(rename = "min60")]
    Min60,
}

impl DurationTier {
    pub fn minutes(&self) -> i64 {
        match self {
            DurationTier::Min15 => 15,
            DurationTier::Min30 => 30,
            DurationTier::Min60 => 60,
        }
    }
}

impl fmt::Display for DurationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationTier::Min15 => write!(f, "min15"),
            DurationTier::Min30 => write!(f, "min30"),
            DurationTier::Min60 => write!(f, "min60"),
        }
    }
}

/// Per-tier price list for online consultations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPrices {
    pub min15: Decimal,
    pub min30: Decimal,
    pub min60: Decimal,
}

impl TierPrices {
    pub fn price(&self, tier: DurationTier) -> Decimal {
        match tier {
            DurationTier::Min15 => self.min15,
            DurationTier::Min30 => self.min30,
            DurationTier::Min60 => self.min60,
        }
    }
}

// ==============================================================================
// DOCTOR
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub online_prices: Option<TierPrices>,
    pub clinic_fee: Option<Decimal>,
    pub home_visit_fixed_cost: Option<Decimal>,
    #[serde(default)]
    pub emergency_fee: Decimal,
    pub is_active: bool,
    /// Durable replacement for a timer: the sweeper deactivates the doctor once passed.
    pub deactivate_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.deactivate_at.map_or(true, |at| at > now)
    }
}

// ==============================================================================
// SUBSCRIPTIONS AND FEE SCHEDULES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    #[serde(alias = "Number")]
    Number,
    #[serde(alias = "Percentage")]
    Percentage,
}

/// A flat or percentage deduction taken from a gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeDescriptor {
    #[serde(rename = "type")]
    pub fee_type: FeeType,
    pub figure: Decimal,
}

impl FeeDescriptor {
    pub fn flat(figure: Decimal) -> Self {
        Self { fee_type: FeeType::Number, figure }
    }

    pub fn percentage(figure: Decimal) -> Self {
        Self { fee_type: FeeType::Percentage, figure }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub platform_fee: FeeDescriptor,
    pub ops_expense: FeeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineFeeSchedule {
    pub min15: FeeSchedule,
    pub min30: FeeSchedule,
    pub min60: FeeSchedule,
}

impl OnlineFeeSchedule {
    pub fn for_tier(&self, tier: DurationTier) -> &FeeSchedule {
        match tier {
            DurationTier::Min15 => &self.min15,
            DurationTier::Min30 => &self.min30,
            DurationTier::Min60 => &self.min60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub online: OnlineFeeSchedule,
    pub clinic: FeeSchedule,
    pub home_visit: FeeSchedule,
    pub emergency: FeeSchedule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSubscription {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub plan: SubscriptionPlan,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl DoctorSubscription {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && self.end_date.map_or(true, |end| end > now)
    }
}
