// libs/appointment-cell/src/services/fees.rs
use rust_decimal::{Decimal, RoundingStrategy};

use doctor_cell::{DurationTier, FeeDescriptor, FeeSchedule, FeeType, SubscriptionPlan};

use crate::models::{AppointmentError, Modality, Settlement};

const MONEY_SCALE: u32 = 2;

/// Computes the platform's cut and the doctor's net from a gross amount.
pub struct FeeCalculator;

impl FeeCalculator {
    pub fn resolve(descriptor: &FeeDescriptor, gross: Decimal) -> Decimal {
        let amount = match descriptor.fee_type {
            FeeType::Number => descriptor.figure,
            FeeType::Percentage => descriptor.figure / Decimal::ONE_HUNDRED * gross,
        };
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn compute(gross: Decimal, schedule: &FeeSchedule) -> Settlement {
        let platform_fee = Self::resolve(&schedule.platform_fee, gross);
        let ops_expense = Self::resolve(&schedule.ops_expense, gross);
        let doctor_net = (gross - platform_fee - ops_expense).max(Decimal::ZERO);

        Settlement {
            platform_fee,
            ops_expense,
            doctor_net,
        }
    }

    /// Online fees are keyed by duration tier; every other modality has one schedule.
    pub fn schedule_for(
        plan: &SubscriptionPlan,
        modality: Modality,
        tier: Option<DurationTier>,
    ) -> Result<&FeeSchedule, AppointmentError> {
        match modality {
            Modality::Online => {
                let tier = tier.ok_or_else(|| {
                    AppointmentError::InvalidRequest("Online settlement needs a duration tier".to_string())
                })?;
                Ok(plan.online.for_tier(tier))
            }
            Modality::Clinic => Ok(&plan.clinic),
            Modality::HomeVisit => Ok(&plan.home_visit),
            Modality::Emergency => Ok(&plan.emergency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctor_cell::OnlineFeeSchedule;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn schedule(platform: FeeDescriptor, ops: FeeDescriptor) -> FeeSchedule {
        FeeSchedule {
            platform_fee: platform,
            ops_expense: ops,
        }
    }

    #[test]
    fn flat_and_percentage_deductions() {
        let fees = FeeCalculator::compute(
            dec!(400),
            &schedule(FeeDescriptor::flat(dec!(50)), FeeDescriptor::percentage(dec!(10))),
        );
        assert_eq!(fees.platform_fee, dec!(50));
        assert_eq!(fees.ops_expense, dec!(40));
        assert_eq!(fees.doctor_net, dec!(310));
    }

    #[test]
    fn net_never_goes_negative() {
        let fees = FeeCalculator::compute(
            dec!(100),
            &schedule(FeeDescriptor::flat(dec!(80)), FeeDescriptor::percentage(dec!(30))),
        );
        assert_eq!(fees.doctor_net, dec!(0));
    }

    #[test]
    fn percentage_rounds_to_cents() {
        let ops = FeeCalculator::resolve(&FeeDescriptor::percentage(dec!(12.5)), dec!(333.33));
        assert_eq!(ops, dec!(41.67));
    }

    #[test]
    fn online_schedule_selected_by_tier() {
        let base = schedule(FeeDescriptor::flat(dec!(10)), FeeDescriptor::percentage(dec!(5)));
        let long = schedule(FeeDescriptor::flat(dec!(40)), FeeDescriptor::percentage(dec!(5)));
        let plan = SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "tiered".to_string(),
            online: OnlineFeeSchedule { min15: base, min30: base, min60: long },
            clinic: base,
            home_visit: base,
            emergency: base,
        };

        let chosen = FeeCalculator::schedule_for(&plan, Modality::Online, Some(DurationTier::Min60)).unwrap();
        assert_eq!(chosen.platform_fee.figure, dec!(40));
        assert!(FeeCalculator::schedule_for(&plan, Modality::Online, None).is_err());
        assert_eq!(
            FeeCalculator::schedule_for(&plan, Modality::Clinic, None).unwrap().platform_fee.figure,
            dec!(10)
        );
    }
}
