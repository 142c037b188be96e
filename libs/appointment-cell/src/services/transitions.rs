// libs/appointment-cell/src/services/transitions.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shared_models::auth::Role;
use video_conferencing_cell::room_name_for;
use wallet_cell::LedgerError;

use crate::models::{
    AppointmentError, JoinResponse, Modality, ModalityDetails, OtpView, PaymentDetails, Reservation,
    ReservationStatus,
};
use crate::services::appointment::{Actor, AppointmentService};
use crate::services::fees::FeeCalculator;
use crate::services::lifecycle::validate_transition;
use crate::services::notification::{dispatch, NotificationEvent};

impl AppointmentService {
    /// Doctor accepts an online or clinic booking. Online bookings get their
    /// video room here; clinic bookings get the OTP the patient shows at the desk.
    /// The room is only opened once the acceptance is stored.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn accept(&self, actor: &Actor, id: Uuid, now: DateTime<Utc>) -> Result<Reservation, AppointmentError> {
        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::Online, Modality::Clinic])?;
        Self::ensure_doctor(actor, &current)?;
        validate_transition(current.modality(), current.status, ReservationStatus::Accepted)?;

        let mut next = current.clone();
        next.status = ReservationStatus::Accepted;

        match current.modality() {
            Modality::Online => {
                next.details = ModalityDetails::Online { room_name: Some(room_name_for(id)) };
            }
            _ => {
                let expiry = self.policy(Modality::Clinic).otp_expiry;
                next.otp = Some(self.otp.generate(now, expiry));
            }
        }

        let accepted = self.write(&current, next, now).await?;
        if accepted.modality() == Modality::Online {
            self.open_room(id).await;
        }
        Ok(accepted)
    }

    /// Doctor accepts a home visit and prices the travel.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn doctor_accept_home_visit(
        &self,
        actor: &Actor,
        id: Uuid,
        travel_cost: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        if travel_cost < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(travel_cost).into());
        }

        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::HomeVisit])?;
        Self::ensure_doctor(actor, &current)?;

        let ModalityDetails::HomeVisit { address, fixed_cost, .. } = &current.details else {
            return Err(AppointmentError::InvalidRequest("Reservation has no home visit details".to_string()));
        };

        let mut next = current.clone();
        next.status = ReservationStatus::DoctorAccepted;
        next.payment = PaymentDetails::awaiting(*fixed_cost + travel_cost);
        next.details = ModalityDetails::HomeVisit {
            address: address.clone(),
            fixed_cost: *fixed_cost,
            travel_cost: Some(travel_cost),
        };

        let updated = self.write(&current, next, now).await?;
        dispatch(&self.notifier, NotificationEvent::TravelCostAdded, &updated);
        Ok(updated)
    }

    /// Doctor turns a booking down. Online bookings end as `rejected`, clinic
    /// and home visit bookings as `cancelled`. Any hold goes back to the patient.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn reject(&self, actor: &Actor, id: Uuid, now: DateTime<Utc>) -> Result<Reservation, AppointmentError> {
        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::Online, Modality::Clinic, Modality::HomeVisit])?;
        Self::ensure_doctor(actor, &current)?;

        let target = match current.modality() {
            Modality::Online => ReservationStatus::Rejected,
            _ => ReservationStatus::Cancelled,
        };
        self.close_without_payment(&current, target, now).await
    }

    /// Patient accepts the home visit total: funds are frozen and the OTP issued.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn patient_confirm(
        &self,
        actor: &Actor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::HomeVisit])?;
        Self::ensure_patient(actor, &current)?;
        validate_transition(current.modality(), current.status, ReservationStatus::PatientConfirmed)?;

        let total = current.payment.gross_amount;
        self.ledger.freeze(current.patient_id, total).await?;

        let mut next = current.clone();
        next.status = ReservationStatus::PatientConfirmed;
        next.payment = PaymentDetails::frozen(total);
        next.otp = Some(self.otp.generate(now, self.policy(Modality::HomeVisit).otp_expiry));

        match self.write(&current, next, now).await {
            Ok(confirmed) => Ok(confirmed),
            Err(e) => {
                self.release_hold(current.patient_id, total, id).await;
                Err(e)
            }
        }
    }

    /// Patient withdraws. Also how a patient declines a home visit quote.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn cancel(&self, actor: &Actor, id: Uuid, now: DateTime<Utc>) -> Result<Reservation, AppointmentError> {
        let current = self.load(id).await?;
        Self::ensure_patient(actor, &current)?;

        if current.otp_used() {
            return Err(AppointmentError::OtpUsed);
        }
        self.close_without_payment(&current, ReservationStatus::Cancelled, now)
            .await
    }

    /// Doctor submits the patient's code to complete a clinic or home visit.
    #[instrument(skip(self, submitted), fields(actor_id = %actor.id))]
    pub async fn complete_with_otp(
        &self,
        actor: &Actor,
        id: Uuid,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::Clinic, Modality::HomeVisit])?;
        Self::ensure_doctor(actor, &current)?;
        if current.otp_used() {
            return Err(AppointmentError::OtpUsed);
        }
        validate_transition(current.modality(), current.status, ReservationStatus::Completed)?;

        let verified = self.otp.validate(id, submitted, now).await?;
        let checked = verified.reservation;
        if checked.status != current.status {
            return Err(AppointmentError::StaleReservation(id));
        }

        let mut next = checked.clone();
        next.otp = Some(verified.otp);
        next.status = ReservationStatus::Completed;

        self.settle(&checked, next, now).await
    }

    /// Hands out a room token. The doctor joining an accepted online
    /// consultation is what completes and settles it.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn join(&self, actor: &Actor, id: Uuid, now: DateTime<Utc>) -> Result<JoinResponse, AppointmentError> {
        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::Online, Modality::Emergency])?;

        let is_doctor = actor.role == Role::Doctor && current.doctor_id == Some(actor.id);
        let is_patient = current.patient_id == actor.id;
        if !is_doctor && !is_patient {
            return Err(AppointmentError::Unauthorized("not a party to this consultation".to_string()));
        }

        let joinable = matches!(
            (current.modality(), current.status),
            (Modality::Online, ReservationStatus::Accepted)
                | (Modality::Online, ReservationStatus::Completed)
                | (Modality::Emergency, ReservationStatus::InProgress)
        );
        if !joinable {
            return Err(AppointmentError::InvalidRequest(format!(
                "{} reservation in status {} has no open room",
                current.modality(),
                current.status
            )));
        }

        if current.room_name().is_none() {
            return Err(AppointmentError::InvalidRequest("No room has been provisioned".to_string()));
        }
        let room_name = self.rooms.provision_room(id).await?;

        let reservation = if is_doctor
            && current.modality() == Modality::Online
            && current.status == ReservationStatus::Accepted
        {
            let mut next = current.clone();
            next.status = ReservationStatus::Completed;
            self.settle(&current, next, now).await?
        } else {
            current
        };

        let access_token = self.rooms.access_token(&actor.id.to_string(), &room_name)?;
        Ok(JoinResponse {
            reservation,
            room_name,
            access_token,
        })
    }

    /// A doctor takes an emergency request. The doctor must be able to settle
    /// before the patient's emergency fee is frozen; a failed write hands the
    /// hold back. The room is opened once the response is stored.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn respond_emergency(
        &self,
        actor: &Actor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        if actor.role != Role::Doctor {
            return Err(AppointmentError::Unauthorized("only doctors can respond to emergencies".to_string()));
        }

        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::Emergency])?;
        if current.doctor_id.is_some_and(|assigned| assigned != actor.id) {
            return Err(AppointmentError::Unauthorized(
                "emergency is assigned to another doctor".to_string(),
            ));
        }
        validate_transition(current.modality(), current.status, ReservationStatus::InProgress)?;

        let doctor = self.doctors.get_bookable_doctor(actor.id, now).await?;
        let fee = doctor.emergency_fee;

        if fee > Decimal::ZERO {
            let subscription = self.doctors.active_subscription(actor.id, now).await?;
            FeeCalculator::schedule_for(&subscription.plan, Modality::Emergency, None)?;
            self.ledger.freeze(current.patient_id, fee).await?;
        }

        let description = match &current.details {
            ModalityDetails::Emergency { description, .. } => description.clone(),
            _ => String::new(),
        };

        let mut next = current.clone();
        next.doctor_id = Some(actor.id);
        next.status = ReservationStatus::InProgress;
        next.payment = if fee > Decimal::ZERO {
            PaymentDetails::frozen(fee)
        } else {
            PaymentDetails::awaiting(Decimal::ZERO)
        };
        next.details = ModalityDetails::Emergency {
            description,
            room_name: Some(room_name_for(id)),
            responded_at: Some(now),
        };

        match self.write(&current, next, now).await {
            Ok(responded) => {
                info!("Doctor {} responded to emergency {}", actor.id, id);
                self.open_room(id).await;
                Ok(responded)
            }
            Err(e) => {
                warn!("Emergency {} response by {} did not stick: {}", id, actor.id, e);
                self.release_hold(current.patient_id, fee, id).await;
                Err(e)
            }
        }
    }

    /// Responding doctor closes the emergency and settles it.
    #[instrument(skip(self), fields(actor_id = %actor.id))]
    pub async fn finalize_emergency(
        &self,
        actor: &Actor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        let current = self.load(id).await?;
        Self::ensure_modality(&current, &[Modality::Emergency])?;
        Self::ensure_doctor(actor, &current)?;

        let mut next = current.clone();
        next.status = ReservationStatus::Completed;
        self.settle(&current, next, now).await
    }

    /// Opens the provider room for a stored reservation. A failure here is
    /// retried when a participant joins.
    async fn open_room(&self, id: Uuid) {
        if let Err(e) = self.rooms.provision_room(id).await {
            warn!("Room for reservation {} not opened yet: {}", id, e);
        }
    }

    /// The patient's own view of their completion code.
    pub async fn reveal_otp(&self, actor: &Actor, id: Uuid) -> Result<OtpView, AppointmentError> {
        let current = self.load(id).await?;
        if current.patient_id != actor.id {
            return Err(AppointmentError::Unauthorized("only the booking patient sees the OTP".to_string()));
        }
        current
            .otp
            .as_ref()
            .map(OtpView::from)
            .ok_or(AppointmentError::OtpMissing)
    }
}
