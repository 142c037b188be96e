// libs/appointment-cell/src/services/settlement.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use wallet_cell::LedgerError;

use crate::models::{AppointmentError, PaymentDetails, PaymentStatus, Reservation, Settlement};
use crate::services::appointment::AppointmentService;
use crate::services::fees::FeeCalculator;
use crate::services::lifecycle::validate_transition;

impl AppointmentService {
    /// Completes `current` as `next`: the patient's hold is committed, the
    /// doctor is credited their net and the reservation is written. If the
    /// reservation write loses a race, both ledger movements are undone.
    pub(crate) async fn settle(
        &self,
        current: &Reservation,
        mut next: Reservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppointmentError> {
        validate_transition(current.modality(), current.status, next.status)?;

        let doctor_id = current
            .doctor_id
            .ok_or_else(|| AppointmentError::InvalidRequest("Reservation has no doctor to settle with".to_string()))?;
        let gross = current.payment.gross_amount;

        if gross.is_zero() {
            next.payment = PaymentDetails::completed(
                Decimal::ZERO,
                Settlement {
                    platform_fee: Decimal::ZERO,
                    ops_expense: Decimal::ZERO,
                    doctor_net: Decimal::ZERO,
                },
            );
            return self.write(current, next, now).await;
        }

        if current.payment.payment_status != PaymentStatus::Frozen || current.payment.amount_frozen < gross {
            return Err(LedgerError::InsufficientFrozen {
                requested: gross,
                frozen: current.payment.amount_frozen,
            }
            .into());
        }

        let subscription = self.doctors.active_subscription(doctor_id, now).await?;
        let schedule = FeeCalculator::schedule_for(
            &subscription.plan,
            current.modality(),
            current.slot.map(|slot| slot.duration),
        )?;
        let fees = FeeCalculator::compute(gross, schedule);

        self.ledger.commit(current.patient_id, gross).await?;

        if fees.doctor_net > Decimal::ZERO {
            if let Err(e) = self.ledger.credit(doctor_id, fees.doctor_net).await {
                warn!("Crediting doctor {} for {} failed: {}", doctor_id, current.id, e);
                self.compensate(current.id, current.patient_id, gross, None).await;
                return Err(e.into());
            }
        }

        next.payment = PaymentDetails::completed(gross, fees);

        match self.write(current, next, now).await {
            Ok(settled) => {
                info!(
                    "Settled {} reservation {}: gross {}, platform {}, ops {}, doctor {}",
                    settled.modality(),
                    settled.id,
                    gross,
                    fees.platform_fee,
                    fees.ops_expense,
                    fees.doctor_net
                );
                Ok(settled)
            }
            Err(e) => {
                warn!("Settlement of {} lost its reservation write, compensating: {}", current.id, e);
                let credited = (fees.doctor_net > Decimal::ZERO).then_some((doctor_id, fees.doctor_net));
                self.compensate(current.id, current.patient_id, gross, credited).await;
                Err(e)
            }
        }
    }

    async fn compensate(
        &self,
        reservation_id: Uuid,
        patient_id: Uuid,
        committed: Decimal,
        credited: Option<(Uuid, Decimal)>,
    ) {
        if let Some((doctor_id, net)) = credited {
            if let Err(e) = self.ledger.reverse_credit(doctor_id, net).await {
                error!(
                    "Could not reverse credit of {} to doctor {} for reservation {}: {}",
                    net, doctor_id, reservation_id, e
                );
            }
        }
        if let Err(e) = self.ledger.restore_commit(patient_id, committed).await {
            error!(
                "Could not restore commit of {} to patient {} for reservation {}: {}",
                committed, patient_id, reservation_id, e
            );
        }
    }
}
