// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{AppointmentError, Modality, Reservation, ReservationStatus, Slot};
use crate::store::ReservationStore;

/// Half-open interval test: `[a_start, a_end)` and `[b_start, b_end)` share time.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn slots_overlap(existing: &Slot, requested: &Slot) -> bool {
    intervals_overlap(
        existing.time.start,
        existing.time.end,
        requested.time.start,
        requested.time.end,
    )
}

pub struct SlotConflictChecker {
    store: Arc<dyn ReservationStore>,
}

impl SlotConflictChecker {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Reservations of `doctor_id` in a blocking status whose slot overlaps
    /// `[start, end)`.
    pub async fn find_conflicts(
        &self,
        doctor_id: Uuid,
        modality: Modality,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        blocking: &[ReservationStatus],
    ) -> Result<Vec<Reservation>, AppointmentError> {
        debug!("Checking {} conflicts for doctor {} from {} to {}", modality, doctor_id, start, end);

        let conflicts: Vec<Reservation> = self
            .store
            .find_by_status(modality, Some(doctor_id), blocking)
            .await?
            .into_iter()
            .filter(|r| {
                r.slot
                    .as_ref()
                    .is_some_and(|s| intervals_overlap(s.time.start, s.time.end, start, end))
            })
            .collect();

        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for doctor {} - {} overlapping {} reservations",
                doctor_id,
                conflicts.len(),
                modality
            );
        }

        Ok(conflicts)
    }

    pub async fn is_free(
        &self,
        doctor_id: Uuid,
        modality: Modality,
        slot: &Slot,
        blocking: &[ReservationStatus],
    ) -> Result<bool, AppointmentError> {
        Ok(self
            .find_conflicts(doctor_id, modality, slot.time.start, slot.time.end, blocking)
            .await?
            .is_empty())
    }
}
