// libs/appointment-cell/src/services/appointment.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info};
use uuid::Uuid;

use doctor_cell::DoctorService;
use shared_models::auth::{Role, User};
use video_conferencing_cell::VideoRoomProvider;
use wallet_cell::LedgerService;

use crate::models::{
    AppointmentError, ConflictCheckQuery, Modality, Reservation, ReservationStatus,
};
use crate::services::conflict::SlotConflictChecker;
use crate::services::lifecycle::{validate_transition, AppointmentPolicyConfig, ModalityPolicy};
use crate::services::notification::{dispatch, NotificationEvent, Notifier};
use crate::services::otp::OtpGate;
use crate::store::ReservationStore;

/// The authenticated caller, as far as the appointment core cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn patient(id: Uuid) -> Self {
        Self { id, role: Role::Patient }
    }

    pub fn doctor(id: Uuid) -> Self {
        Self { id, role: Role::Doctor }
    }

    pub fn admin(id: Uuid) -> Self {
        Self { id, role: Role::Admin }
    }

    pub fn from_user(user: &User) -> Result<Self, AppointmentError> {
        let id = user
            .principal_id()
            .ok_or_else(|| AppointmentError::Unauthorized("principal id is not a UUID".to_string()))?;
        let role = user
            .principal_role()
            .ok_or_else(|| AppointmentError::Unauthorized("principal has no recognised role".to_string()))?;
        Ok(Self { id, role })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Booking, transitions, settlement and sweeping for every modality. The
/// methods live in `booking.rs`, `transitions.rs`, `settlement.rs` and
/// `sweeper.rs`; this file holds the shared plumbing.
pub struct AppointmentService {
    pub(crate) store: Arc<dyn ReservationStore>,
    pub(crate) ledger: Arc<LedgerService>,
    pub(crate) doctors: Arc<DoctorService>,
    pub(crate) rooms: Arc<dyn VideoRoomProvider>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) policies: AppointmentPolicyConfig,
    pub(crate) conflicts: SlotConflictChecker,
    pub(crate) otp: OtpGate,
}

impl AppointmentService {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        ledger: Arc<LedgerService>,
        doctors: Arc<DoctorService>,
        rooms: Arc<dyn VideoRoomProvider>,
        notifier: Arc<dyn Notifier>,
        policies: AppointmentPolicyConfig,
    ) -> Self {
        Self {
            conflicts: SlotConflictChecker::new(store.clone()),
            otp: OtpGate::new(store.clone()),
            store,
            ledger,
            doctors,
            rooms,
            notifier,
            policies,
        }
    }

    pub fn policy(&self, modality: Modality) -> ModalityPolicy {
        self.policies.policy(modality)
    }

    /// Visible to its patient, its doctor and admins. An unanswered emergency
    /// with no assigned doctor is visible to any doctor.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Reservation, AppointmentError> {
        let reservation = self.load(id).await?;

        let is_party = reservation.patient_id == actor.id || reservation.doctor_id == Some(actor.id);
        let open_emergency = reservation.modality() == Modality::Emergency
            && reservation.doctor_id.is_none()
            && actor.role == Role::Doctor;

        if !(is_party || open_emergency || actor.is_admin()) {
            return Err(AppointmentError::Unauthorized(
                "not a party to this reservation".to_string(),
            ));
        }
        Ok(reservation)
    }

    pub async fn check_conflicts(&self, query: &ConflictCheckQuery) -> Result<Vec<Reservation>, AppointmentError> {
        if query.end <= query.start {
            return Err(AppointmentError::InvalidSlot(
                "Range end must be after its start".to_string(),
            ));
        }
        let policy = self.policy(query.modality);
        self.conflicts
            .find_conflicts(
                query.doctor_id,
                query.modality,
                query.start,
                query.end,
                policy.blocking_statuses,
            )
            .await
    }

    pub(crate) async fn load(&self, id: Uuid) -> Result<Reservation, AppointmentError> {
        self.store
            .get(id)
            .await?
            .ok_or(AppointmentError::NotFound(id))
    }

    pub(crate) fn ensure_patient(actor: &Actor, reservation: &Reservation) -> Result<(), AppointmentError> {
        if reservation.patient_id == actor.id || actor.is_admin() {
            return Ok(());
        }
        Err(AppointmentError::Unauthorized(
            "only the booking patient may do this".to_string(),
        ))
    }

    pub(crate) fn ensure_doctor(actor: &Actor, reservation: &Reservation) -> Result<(), AppointmentError> {
        if actor.is_admin() || (actor.role == Role::Doctor && reservation.doctor_id == Some(actor.id)) {
            return Ok(());
        }
        Err(AppointmentError::Unauthorized(
            "only the assigned doctor may do this".to_string(),
        ))
    }

    pub(crate) fn ensure_modality(reservation: &Reservation, allowed: &[Modality]) -> Result<(), AppointmentError> {
        if allowed.contains(&reservation.modality()) {
            return Ok(());
        }
        Err(AppointmentError::InvalidRequest(format!(
            "operation not available for {} reservations",
            reservation.modality()
        )))
    }

    /// Persists `next` over `current`, checking the status edge and the
    /// version. A lost race surfaces as `StaleReservation`.
    pub(crate) async fn write(
        &self,
        current: &Reservation,
        mut next: Reservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        if next.status != current.status {
            validate_transition(current.modality(), current.status, next.status)?;
        }
        next.version = current.version + 1;
        next.updated_at = now;

        if !self.store.compare_and_swap(current.version, &next).await? {
            debug!("Reservation {} changed under us at version {}", current.id, current.version);
            return Err(AppointmentError::StaleReservation(current.id));
        }

        if next.status != current.status {
            info!(
                "{} reservation {} moved {} -> {}",
                next.modality(),
                next.id,
                current.status,
                next.status
            );
            dispatch(&self.notifier, NotificationEvent::StatusChanged, &next);
        }
        Ok(next)
    }

    /// Moves a reservation to a terminal status without payment and hands
    /// back whatever it held. The write happens first so only one caller
    /// can win the release.
    pub(crate) async fn close_without_payment(
        &self,
        current: &Reservation,
        to: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        validate_transition(current.modality(), current.status, to)?;

        let mut next = current.clone();
        next.status = to;
        next.payment = current.payment.released();

        let closed = self.write(current, next, now).await?;
        self.release_hold(current.patient_id, current.payment.amount_frozen, current.id)
            .await;
        Ok(closed)
    }

    pub(crate) async fn release_hold(&self, patient_id: Uuid, amount: Decimal, reservation_id: Uuid) {
        if amount <= Decimal::ZERO {
            return;
        }
        match self.ledger.unfreeze(patient_id, amount).await {
            Ok(_) => debug!("Released {} held for reservation {}", amount, reservation_id),
            Err(e) => error!(
                "Failed to release {} for reservation {} on wallet {}: {}",
                amount, reservation_id, patient_id, e
            ),
        }
    }
}
