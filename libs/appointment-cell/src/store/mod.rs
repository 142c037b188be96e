use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Modality, Reservation, ReservationStatus};

pub mod memory;
pub mod supabase;

pub use memory::MemoryReservationStore;
pub use supabase::SupabaseReservationStore;

/// Persistence for reservations. Records are never deleted; every change
/// after creation is a compare-and-swap on `version`.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Reservation>>;

    /// Reservations of one modality whose status is in `statuses`,
    /// optionally narrowed to one doctor.
    async fn find_by_status(
        &self,
        modality: Modality,
        doctor_id: Option<Uuid>,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>>;

    /// Inserts a slotted reservation unless a reservation of the same doctor
    /// and modality in one of `blocking` statuses overlaps it. The check and
    /// the insert are atomic. Returns false when the slot was taken.
    async fn insert_if_slot_free(&self, reservation: &Reservation, blocking: &[ReservationStatus]) -> Result<bool>;

    /// Inserts a reservation that holds no slot.
    async fn insert(&self, reservation: &Reservation) -> Result<()>;

    /// Writes `next` only if the stored version still equals `expected_version`.
    async fn compare_and_swap(&self, expected_version: i64, next: &Reservation) -> Result<bool>;
}
