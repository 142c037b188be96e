// libs/appointment-cell/src/services/booking.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use shared_models::auth::Role;

use crate::models::{
    AppointmentError, BookEmergencyRequest, BookHomeVisitRequest, BookSlotRequest, Modality,
    ModalityDetails, PaymentDetails, Reservation, Slot,
};
use crate::services::appointment::{Actor, AppointmentService};
use crate::services::lifecycle::FreezeStage;
use crate::services::notification::{dispatch, NotificationEvent};

impl AppointmentService {
    #[instrument(skip(self, request), fields(patient_id = %actor.id, doctor_id = %request.doctor_id))]
    pub async fn book_online(
        &self,
        actor: &Actor,
        request: BookSlotRequest,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        let doctor = self.doctors.get_bookable_doctor(request.doctor_id, now).await?;
        let price = doctor
            .online_prices
            .as_ref()
            .map(|prices| prices.price(request.slot.duration))
            .ok_or_else(|| AppointmentError::InvalidRequest("Doctor does not offer online consultations".to_string()))?;

        self.book_slotted(
            actor,
            request.doctor_id,
            request.slot,
            ModalityDetails::Online { room_name: None },
            price,
            now,
        )
        .await
    }

    #[instrument(skip(self, request), fields(patient_id = %actor.id, doctor_id = %request.doctor_id))]
    pub async fn book_clinic(
        &self,
        actor: &Actor,
        request: BookSlotRequest,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        let doctor = self.doctors.get_bookable_doctor(request.doctor_id, now).await?;
        let fee = doctor
            .clinic_fee
            .ok_or_else(|| AppointmentError::InvalidRequest("Doctor does not offer clinic visits".to_string()))?;

        self.book_slotted(actor, request.doctor_id, request.slot, ModalityDetails::Clinic {}, fee, now)
            .await
    }

    /// Books with the fixed cost only; travel cost is added by the doctor
    /// and nothing is frozen until the patient confirms the total.
    #[instrument(skip(self, request), fields(patient_id = %actor.id, doctor_id = %request.doctor_id))]
    pub async fn book_home_visit(
        &self,
        actor: &Actor,
        request: BookHomeVisitRequest,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        if request.address.trim().is_empty() {
            return Err(AppointmentError::InvalidRequest("Home visit needs an address".to_string()));
        }

        let doctor = self.doctors.get_bookable_doctor(request.doctor_id, now).await?;
        let fixed_cost = doctor
            .home_visit_fixed_cost
            .ok_or_else(|| AppointmentError::InvalidRequest("Doctor does not offer home visits".to_string()))?;

        let details = ModalityDetails::HomeVisit {
            address: request.address.trim().to_string(),
            fixed_cost,
            travel_cost: None,
        };

        self.book_slotted(actor, request.doctor_id, request.slot, details, fixed_cost, now)
            .await
    }

    /// Emergencies hold no slot and no funds until a doctor responds.
    #[instrument(skip(self, request), fields(patient_id = %actor.id))]
    pub async fn book_emergency(
        &self,
        actor: &Actor,
        request: BookEmergencyRequest,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        Self::ensure_booking_patient(actor)?;

        let description = request.description.trim();
        if description.is_empty() {
            return Err(AppointmentError::InvalidRequest(
                "Emergency request needs a description".to_string(),
            ));
        }

        if let Some(doctor_id) = request.doctor_id {
            self.doctors.get_bookable_doctor(doctor_id, now).await?;
        }

        let reservation = Reservation::new(
            actor.id,
            request.doctor_id,
            None,
            ModalityDetails::Emergency {
                description: description.to_string(),
                room_name: None,
                responded_at: None,
            },
            PaymentDetails::awaiting(Decimal::ZERO),
            now,
        );

        self.store.insert(&reservation).await?;
        info!("Emergency request {} raised by {}", reservation.id, actor.id);
        dispatch(&self.notifier, NotificationEvent::BookingCreated, &reservation);

        Ok(reservation)
    }

    fn ensure_booking_patient(actor: &Actor) -> Result<(), AppointmentError> {
        if actor.role == Role::Patient {
            return Ok(());
        }
        Err(AppointmentError::Unauthorized("only patients can book".to_string()))
    }

    async fn book_slotted(
        &self,
        actor: &Actor,
        doctor_id: Uuid,
        slot: Slot,
        details: ModalityDetails,
        gross: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        Self::ensure_booking_patient(actor)?;
        slot.validate()?;
        if slot.time.end <= now {
            return Err(AppointmentError::InvalidSlot("Slot is already over".to_string()));
        }
        if gross <= Decimal::ZERO {
            return Err(AppointmentError::InvalidRequest(format!(
                "Doctor has no price configured for this booking, got {}",
                gross
            )));
        }

        let modality: Modality = details.modality();
        let policy = self.policy(modality);

        if !self
            .conflicts
            .is_free(doctor_id, modality, &slot, policy.blocking_statuses)
            .await?
        {
            return Err(AppointmentError::SlotUnavailable);
        }

        let freeze_now = policy.freeze_stage == FreezeStage::AtBooking;
        let payment = if freeze_now {
            self.ledger.freeze(actor.id, gross).await?;
            PaymentDetails::frozen(gross)
        } else {
            PaymentDetails::awaiting(gross)
        };

        let reservation = Reservation::new(actor.id, Some(doctor_id), Some(slot), details, payment, now);

        let inserted = self
            .store
            .insert_if_slot_free(&reservation, policy.blocking_statuses)
            .await;

        match inserted {
            Ok(true) => {}
            Ok(false) => {
                warn!("Slot for doctor {} taken while booking {}", doctor_id, reservation.id);
                if freeze_now {
                    self.release_hold(actor.id, gross, reservation.id).await;
                }
                return Err(AppointmentError::SlotUnavailable);
            }
            Err(e) => {
                if freeze_now {
                    self.release_hold(actor.id, gross, reservation.id).await;
                }
                return Err(e.into());
            }
        }

        info!(
            "{} reservation {} booked with doctor {} for {}",
            modality, reservation.id, doctor_id, gross
        );
        dispatch(&self.notifier, NotificationEvent::BookingCreated, &reservation);

        Ok(reservation)
    }
}
