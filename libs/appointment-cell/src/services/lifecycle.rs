// libs/appointment-cell/src/services/lifecycle.rs
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{AppointmentError, Modality, Reservation, ReservationStatus};

use crate::models::ReservationStatus::*;

/// Statuses each status may move to, per modality. Statuses with no
/// outgoing edge are terminal.
pub fn valid_transitions(modality: Modality, status: ReservationStatus) -> &'static [ReservationStatus] {
    match (modality, status) {
        (Modality::Online, Pending) => &[Accepted, Rejected, Expired, Cancelled],
        (Modality::Online, Accepted) => &[Completed, Unattended],

        (Modality::Clinic, Pending) => &[Accepted, Cancelled, Expired],
        (Modality::Clinic, Accepted) => &[Completed, Unattended, Cancelled],

        (Modality::HomeVisit, Pending) => &[DoctorAccepted, Cancelled, Expired],
        (Modality::HomeVisit, DoctorAccepted) => &[PatientConfirmed, Cancelled, Expired],
        (Modality::HomeVisit, PatientConfirmed) => &[Completed, Cancelled, Expired],

        (Modality::Emergency, Pending) => &[InProgress, Cancelled, Expired],
        (Modality::Emergency, InProgress) => &[Completed, Unattended],

        _ => &[],
    }
}

pub fn is_terminal(modality: Modality, status: ReservationStatus) -> bool {
    valid_transitions(modality, status).is_empty()
}

/// Statuses that still have somewhere to go, i.e. what the sweeper scans.
pub fn open_statuses(modality: Modality) -> &'static [ReservationStatus] {
    match modality {
        Modality::Online | Modality::Clinic => &[Pending, Accepted],
        Modality::HomeVisit => &[Pending, DoctorAccepted, PatientConfirmed],
        Modality::Emergency => &[Pending, InProgress],
    }
}

pub fn validate_transition(
    modality: Modality,
    from: ReservationStatus,
    to: ReservationStatus,
) -> Result<(), AppointmentError> {
    if valid_transitions(modality, from).contains(&to) {
        debug!("{} transition validated: {} -> {}", modality, from, to);
        return Ok(());
    }
    warn!("Invalid {} transition attempted: {} -> {}", modality, from, to);
    Err(AppointmentError::InvalidTransition { modality, from, to })
}

// ==============================================================================
// PER-MODALITY POLICY
// ==============================================================================

/// When the patient's funds are put on hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeStage {
    AtBooking,
    AtPatientConfirm,
    AtResponse,
}

/// What an accepted online consultation becomes when its slot passes
/// without the doctor joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptedExpiryPolicy {
    Unattended,
    Complete,
}

impl FromStr for AcceptedExpiryPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "unattended" => Ok(AcceptedExpiryPolicy::Unattended),
            "complete" | "completed" => Ok(AcceptedExpiryPolicy::Complete),
            other => Err(format!("unknown accepted expiry policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModalityPolicy {
    pub modality: Modality,
    pub freeze_stage: FreezeStage,
    pub otp_expiry: Option<Duration>,
    /// Statuses that hold a slot against new bookings.
    pub blocking_statuses: &'static [ReservationStatus],
    pub accepted_expiry: AcceptedExpiryPolicy,
    pub response_window: Option<Duration>,
    /// How long a responded emergency may stay open before it is abandoned.
    pub finalize_window: Option<Duration>,
}

impl ModalityPolicy {
    /// True once a reservation's time window has closed.
    pub fn is_due(&self, reservation: &Reservation, now: DateTime<Utc>) -> bool {
        match (&reservation.slot, reservation.status) {
            (Some(slot), _) => slot.time.end < now,
            (None, Pending) => self
                .response_window
                .is_some_and(|window| reservation.created_at + window < now),
            (None, InProgress) => {
                let since = reservation.responded_at().unwrap_or(reservation.updated_at);
                self.finalize_window.is_some_and(|window| since + window < now)
            }
            (None, _) => false,
        }
    }

    /// Where the sweeper sends a due reservation, if anywhere.
    pub fn sweep_target(&self, status: ReservationStatus) -> Option<ReservationStatus> {
        match (self.modality, status) {
            (_, Pending) => Some(Expired),
            (Modality::Online, Accepted) => Some(match self.accepted_expiry {
                AcceptedExpiryPolicy::Unattended => Unattended,
                AcceptedExpiryPolicy::Complete => Completed,
            }),
            (Modality::Clinic, Accepted) => Some(Unattended),
            (Modality::HomeVisit, DoctorAccepted | PatientConfirmed) => Some(Expired),
            (Modality::Emergency, InProgress) => Some(Unattended),
            _ => None,
        }
    }
}

/// Appointment policy knobs read from `AppConfig`.
#[derive(Debug, Clone)]
pub struct AppointmentPolicyConfig {
    pub clinic_otp_expiry: Option<Duration>,
    pub home_visit_otp_expiry: Option<Duration>,
    pub emergency_response_window: Duration,
    pub emergency_finalize_window: Duration,
    pub online_accepted_expiry: AcceptedExpiryPolicy,
}

impl Default for AppointmentPolicyConfig {
    fn default() -> Self {
        Self {
            clinic_otp_expiry: Some(Duration::hours(24)),
            home_visit_otp_expiry: Some(Duration::hours(24)),
            emergency_response_window: Duration::minutes(30),
            emergency_finalize_window: Duration::hours(4),
            online_accepted_expiry: AcceptedExpiryPolicy::Unattended,
        }
    }
}

impl AppointmentPolicyConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        let online_accepted_expiry = config
            .online_accepted_expiry_policy
            .parse()
            .unwrap_or_else(|e| {
                warn!("{}, using unattended", e);
                AcceptedExpiryPolicy::Unattended
            });

        Self {
            clinic_otp_expiry: config.clinic_otp_expiry_hours.map(Duration::hours),
            home_visit_otp_expiry: config.home_visit_otp_expiry_hours.map(Duration::hours),
            emergency_response_window: Duration::minutes(config.emergency_response_window_minutes),
            emergency_finalize_window: Duration::minutes(config.emergency_finalize_window_minutes),
            online_accepted_expiry,
        }
    }

    pub fn policy(&self, modality: Modality) -> ModalityPolicy {
        match modality {
            Modality::Online => ModalityPolicy {
                modality,
                freeze_stage: FreezeStage::AtBooking,
                otp_expiry: None,
                blocking_statuses: &[Pending, Accepted],
                accepted_expiry: self.online_accepted_expiry,
                response_window: None,
                finalize_window: None,
            },
            Modality::Clinic => ModalityPolicy {
                modality,
                freeze_stage: FreezeStage::AtBooking,
                otp_expiry: self.clinic_otp_expiry,
                blocking_statuses: &[Pending, Accepted],
                accepted_expiry: AcceptedExpiryPolicy::Unattended,
                response_window: None,
                finalize_window: None,
            },
            Modality::HomeVisit => ModalityPolicy {
                modality,
                freeze_stage: FreezeStage::AtPatientConfirm,
                otp_expiry: self.home_visit_otp_expiry,
                blocking_statuses: &[Pending, DoctorAccepted, PatientConfirmed],
                accepted_expiry: AcceptedExpiryPolicy::Unattended,
                response_window: None,
                finalize_window: None,
            },
            Modality::Emergency => ModalityPolicy {
                modality,
                freeze_stage: FreezeStage::AtResponse,
                otp_expiry: None,
                blocking_statuses: &[],
                accepted_expiry: AcceptedExpiryPolicy::Unattended,
                response_window: Some(self.emergency_response_window),
                finalize_window: Some(self.emergency_finalize_window),
            },
        }
    }
}
