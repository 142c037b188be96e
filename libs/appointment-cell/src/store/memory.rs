use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Modality, Reservation, ReservationStatus};
use crate::services::conflict::slots_overlap;
use crate::store::ReservationStore;

/// Process-local reservation store used for tests and `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryReservationStore {
    reservations: RwLock<HashMap<Uuid, Reservation>>,
}

impl MemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a reservation without version checks.
    pub async fn put(&self, reservation: Reservation) {
        self.reservations.write().await.insert(reservation.id, reservation);
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn get(&self, id: Uuid) -> Result<Option<Reservation>> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn find_by_status(
        &self,
        modality: Modality,
        doctor_id: Option<Uuid>,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>> {
        let reservations = self.reservations.read().await;
        let mut found: Vec<Reservation> = reservations
            .values()
            .filter(|r| r.modality() == modality && statuses.contains(&r.status))
            .filter(|r| doctor_id.is_none() || r.doctor_id == doctor_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    async fn insert_if_slot_free(&self, reservation: &Reservation, blocking: &[ReservationStatus]) -> Result<bool> {
        let slot = reservation
            .slot
            .as_ref()
            .ok_or_else(|| anyhow!("reservation {} has no slot", reservation.id))?;

        let mut reservations = self.reservations.write().await;
        let taken = reservations.values().any(|existing| {
            existing.doctor_id == reservation.doctor_id
                && existing.modality() == reservation.modality()
                && blocking.contains(&existing.status)
                && existing.slot.as_ref().is_some_and(|s| slots_overlap(s, slot))
        });
        if taken {
            return Ok(false);
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(true)
    }

    async fn insert(&self, reservation: &Reservation) -> Result<()> {
        let mut reservations = self.reservations.write().await;
        if reservations.contains_key(&reservation.id) {
            return Err(anyhow!("reservation {} already exists", reservation.id));
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn compare_and_swap(&self, expected_version: i64, next: &Reservation) -> Result<bool> {
        let mut reservations = self.reservations.write().await;
        match reservations.get_mut(&next.id) {
            Some(current) if current.version == expected_version => {
                *current = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
