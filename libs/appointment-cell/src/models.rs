// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::{DoctorError, DurationTier};
use shared_models::error::AppError;
use video_conferencing_cell::VideoRoomError;
use wallet_cell::LedgerError;

// ==============================================================================
// MODALITY AND STATUS
// ==============================================================================

/// Appointment type. Also the tag prescriptions and ratings are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Online,
    Clinic,
    HomeVisit,
    Emergency,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Online,
        Modality::Clinic,
        Modality::HomeVisit,
        Modality::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Online => "online",
            Modality::Clinic => "clinic",
            Modality::HomeVisit => "home_visit",
            Modality::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Expired,
    Cancelled,
    Unattended,
    DoctorAccepted,
    PatientConfirmed,
    #[serde(rename = "in-progress")]
    InProgress,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Accepted => "accepted",
            ReservationStatus::Rejected => "rejected",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Expired => "expired",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Unattended => "unattended",
            ReservationStatus::DoctorAccepted => "doctor_accepted",
            ReservationStatus::PatientConfirmed => "patient_confirmed",
            ReservationStatus::InProgress => "in-progress",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==============================================================================
// SLOT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub day: NaiveDate,
    pub duration: DurationTier,
    pub time: TimeRange,
}

impl Slot {
    /// A slot is well formed when it starts on `day` and spans exactly its duration tier.
    pub fn validate(&self) -> Result<(), AppointmentError> {
        if self.time.end <= self.time.start {
            return Err(AppointmentError::InvalidSlot(
                "Slot end must be after its start".to_string(),
            ));
        }
        if self.time.start.date_naive() != self.day {
            return Err(AppointmentError::InvalidSlot(format!(
                "Slot starts on {} but is filed under {}",
                self.time.start.date_naive(),
                self.day
            )));
        }
        let minutes = (self.time.end - self.time.start).num_minutes();
        if minutes != self.duration.minutes() {
            return Err(AppointmentError::InvalidSlot(format!(
                "Slot spans {} minutes, expected {} for {}",
                minutes,
                self.duration.minutes(),
                self.duration
            )));
        }
        Ok(())
    }
}

// ==============================================================================
// PAYMENT AND OTP
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Frozen,
    Completed,
    Failed,
}

/// Split of a settled gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub platform_fee: Decimal,
    pub ops_expense: Decimal,
    pub doctor_net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub gross_amount: Decimal,
    pub amount_deducted_from_wallet: Decimal,
    pub amount_frozen: Decimal,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub settlement: Option<Settlement>,
}

impl PaymentDetails {
    /// Nothing reserved yet.
    pub fn awaiting(gross_amount: Decimal) -> Self {
        Self {
            gross_amount,
            amount_deducted_from_wallet: Decimal::ZERO,
            amount_frozen: Decimal::ZERO,
            payment_status: PaymentStatus::Pending,
            settlement: None,
        }
    }

    /// The whole gross amount is held on the patient's wallet.
    pub fn frozen(gross_amount: Decimal) -> Self {
        Self {
            amount_frozen: gross_amount,
            payment_status: PaymentStatus::Frozen,
            ..Self::awaiting(gross_amount)
        }
    }

    pub fn completed(gross_amount: Decimal, settlement: Settlement) -> Self {
        Self {
            gross_amount,
            amount_deducted_from_wallet: gross_amount,
            amount_frozen: Decimal::ZERO,
            payment_status: PaymentStatus::Completed,
            settlement: Some(settlement),
        }
    }

    /// Terminal without payment: any hold has been handed back.
    pub fn released(&self) -> Self {
        Self {
            amount_frozen: Decimal::ZERO,
            payment_status: PaymentStatus::Failed,
            ..self.clone()
        }
    }

    pub fn holds_invariant(&self) -> bool {
        let within_gross = self.amount_frozen + self.amount_deducted_from_wallet <= self.gross_amount;
        let settled_clean = self.payment_status != PaymentStatus::Completed
            || (self.amount_frozen.is_zero() && self.amount_deducted_from_wallet == self.gross_amount);
        within_gross && settled_clean
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub code: String,
    pub generated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub used: bool,
}

// ==============================================================================
// RESERVATION
// ==============================================================================

/// Per-modality data carried next to the shared reservation fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "snake_case")]
pub enum ModalityDetails {
    Online {
        #[serde(default)]
        room_name: Option<String>,
    },
    Clinic {},
    HomeVisit {
        address: String,
        fixed_cost: Decimal,
        #[serde(default)]
        travel_cost: Option<Decimal>,
    },
    Emergency {
        description: String,
        #[serde(default)]
        room_name: Option<String>,
        #[serde(default)]
        responded_at: Option<DateTime<Utc>>,
    },
}

impl ModalityDetails {
    pub fn modality(&self) -> Modality {
        match self {
            ModalityDetails::Online { .. } => Modality::Online,
            ModalityDetails::Clinic {} => Modality::Clinic,
            ModalityDetails::HomeVisit { .. } => Modality::HomeVisit,
            ModalityDetails::Emergency { .. } => Modality::Emergency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    /// Unset only for an emergency request nobody has answered yet.
    pub doctor_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub slot: Option<Slot>,
    pub status: ReservationStatus,
    pub payment: PaymentDetails,
    #[serde(default)]
    pub otp: Option<OtpRecord>,
    pub details: ModalityDetails,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        patient_id: Uuid,
        doctor_id: Option<Uuid>,
        slot: Option<Slot>,
        details: ModalityDetails,
        payment: PaymentDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            slot,
            status: ReservationStatus::Pending,
            payment,
            otp: None,
            details,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn modality(&self) -> Modality {
        self.details.modality()
    }

    pub fn room_name(&self) -> Option<&str> {
        match &self.details {
            ModalityDetails::Online { room_name } | ModalityDetails::Emergency { room_name, .. } => {
                room_name.as_deref()
            }
            _ => None,
        }
    }

    /// When a doctor took an emergency request.
    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        match &self.details {
            ModalityDetails::Emergency { responded_at, .. } => *responded_at,
            _ => None,
        }
    }

    pub fn otp_used(&self) -> bool {
        self.otp.as_ref().is_some_and(|otp| otp.used)
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

/// Online and clinic bookings.
#[derive(Debug, Clone, Deserialize)]
pub struct BookSlotRequest {
    pub doctor_id: Uuid,
    pub slot: Slot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookHomeVisitRequest {
    pub doctor_id: Uuid,
    pub slot: Slot,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookEmergencyRequest {
    pub description: String,
    /// Restricts who may respond. Open to any active doctor when absent.
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorAcceptRequest {
    pub travel_cost: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteWithOtpRequest {
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckQuery {
    pub doctor_id: Uuid,
    pub modality: Modality,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResponse {
    pub reservation: Reservation,
    pub room_name: String,
    pub access_token: String,
}

/// What the patient may see of their code.
#[derive(Debug, Clone, Serialize)]
pub struct OtpView {
    pub code: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining_attempts: u32,
    pub used: bool,
}

impl From<&OtpRecord> for OtpView {
    fn from(otp: &OtpRecord) -> Self {
        Self {
            code: otp.code.clone(),
            expires_at: otp.expires_at,
            remaining_attempts: otp.max_attempts.saturating_sub(otp.attempts),
            used: otp.used,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepCounts {
    pub expired_count: u32,
    pub completed_count: u32,
    pub unattended_count: u32,
}

impl SweepCounts {
    pub fn record(&mut self, status: ReservationStatus) {
        match status {
            ReservationStatus::Expired => self.expired_count += 1,
            ReservationStatus::Completed => self.completed_count += 1,
            ReservationStatus::Unattended => self.unattended_count += 1,
            _ => {}
        }
    }

    pub fn merge(&mut self, other: &SweepCounts) {
        self.expired_count += other.expired_count;
        self.completed_count += other.completed_count;
        self.unattended_count += other.unattended_count;
    }

    pub fn is_empty(&self) -> bool {
        *self == SweepCounts::default()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub online: SweepCounts,
    pub clinic: SweepCounts,
    pub home_visit: SweepCounts,
    pub emergency: SweepCounts,
    pub total: SweepCounts,
    pub failures: u32,
    pub doctors_deactivated: usize,
}

impl SweepReport {
    pub fn counts_mut(&mut self, modality: Modality) -> &mut SweepCounts {
        match modality {
            Modality::Online => &mut self.online,
            Modality::Clinic => &mut self.clinic,
            Modality::HomeVisit => &mut self.home_visit,
            Modality::Emergency => &mut self.emergency,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Reservation {0} not found")]
    NotFound(Uuid),

    #[error("Requested slot overlaps an existing booking")]
    SlotUnavailable,

    #[error("{modality} reservation cannot move from {from} to {to}")]
    InvalidTransition {
        modality: Modality,
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("No OTP has been generated for this reservation")]
    OtpMissing,

    #[error("OTP has already been used")]
    OtpUsed,

    #[error("OTP has expired")]
    OtpExpired,

    #[error("Maximum OTP attempts reached")]
    MaxAttempts,

    #[error("OTP does not match, {remaining_attempts} attempts remaining")]
    OtpMismatch { remaining_attempts: u32 },

    #[error("Reservation {0} was modified concurrently")]
    StaleReservation(Uuid),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Video(#[from] VideoRoomError),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppointmentError {
    pub fn action(&self) -> &'static str {
        match self {
            AppointmentError::InvalidSlot(_) => "invalid-slot",
            AppointmentError::InvalidRequest(_) => "invalid-request",
            AppointmentError::NotFound(_) => "reservation-not-found",
            AppointmentError::SlotUnavailable => "slot-unavailable",
            AppointmentError::InvalidTransition { .. } => "invalid-transition",
            AppointmentError::OtpMissing => "otp-missing",
            AppointmentError::OtpUsed => "otp-used",
            AppointmentError::OtpExpired => "otp-expired",
            AppointmentError::MaxAttempts => "max-attempts",
            AppointmentError::OtpMismatch { .. } => "otp-mismatch",
            AppointmentError::StaleReservation(_) => "stale-reservation",
            AppointmentError::Unauthorized(_) => "unauthorized",
            AppointmentError::Ledger(e) => e.action(),
            AppointmentError::Doctor(e) => e.action(),
            AppointmentError::Video(e) => e.action(),
            AppointmentError::Storage(_) => "storage-error",
        }
    }
}

impl From<anyhow::Error> for AppointmentError {
    fn from(e: anyhow::Error) -> Self {
        AppointmentError::Storage(e.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let action = e.action();
        match e {
            AppointmentError::Ledger(inner) => inner.into(),
            AppointmentError::InvalidSlot(_) | AppointmentError::InvalidRequest(_) => {
                AppError::ValidationError(action, e.to_string())
            }
            AppointmentError::NotFound(_) => AppError::NotFound(action, e.to_string()),
            AppointmentError::Doctor(DoctorError::NotFound(_))
            | AppointmentError::Doctor(DoctorError::SubscriptionNotFound(_)) => {
                AppError::NotFound(action, e.to_string())
            }
            AppointmentError::Doctor(DoctorError::Storage(msg)) => AppError::Database(msg),
            AppointmentError::Unauthorized(_) => AppError::Forbidden(action, e.to_string()),
            AppointmentError::Video(_) => AppError::ExternalService(action, e.to_string()),
            AppointmentError::Storage(msg) => AppError::Database(msg),
            _ => AppError::Conflict(action, e.to_string()),
        }
    }
}
