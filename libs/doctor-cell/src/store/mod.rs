use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Doctor, DoctorSubscription};

pub mod memory;
pub mod supabase;

pub use memory::MemoryDoctorDirectory;
pub use supabase::SupabaseDoctorDirectory;

/// Read access to doctors and their subscriptions, plus the one write the
/// sweeper needs: applying scheduled deactivations.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>>;

    async fn subscriptions(&self, doctor_id: Uuid) -> Result<Vec<DoctorSubscription>>;

    /// Flips `is_active` off for every active doctor whose `deactivate_at` has passed.
    /// Returns the ids that changed.
    async fn deactivate_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>>;
}
