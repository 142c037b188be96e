// libs/doctor-cell/src/services/doctor.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DoctorError;
use crate::models::{Doctor, DoctorSubscription};
use crate::store::DoctorDirectory;

pub struct DoctorService {
    directory: Arc<dyn DoctorDirectory>,
}

impl DoctorService {
    pub fn new(directory: Arc<dyn DoctorDirectory>) -> Self {
        Self { directory }
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        self.directory
            .get_doctor(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound(doctor_id))
    }

    /// Loads a doctor that can take new bookings right now.
    pub async fn get_bookable_doctor(&self, doctor_id: Uuid, now: DateTime<Utc>) -> Result<Doctor, DoctorError> {
        let doctor = self.get_doctor(doctor_id).await?;
        if !doctor.is_bookable(now) {
            debug!("Doctor {} rejected booking: inactive", doctor_id);
            return Err(DoctorError::Inactive(doctor_id));
        }
        Ok(doctor)
    }

    /// The subscription in force at `now`. When several overlap the most
    /// recently started one wins.
    pub async fn active_subscription(
        &self,
        doctor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DoctorSubscription, DoctorError> {
        self.directory
            .subscriptions(doctor_id)
            .await?
            .into_iter()
            .filter(|s| s.is_active(now))
            .max_by_key(|s| s.start_date)
            .ok_or_else(|| {
                warn!("No active subscription for doctor {}", doctor_id);
                DoctorError::SubscriptionNotFound(doctor_id)
            })
    }

    pub async fn apply_scheduled_deactivations(&self, now: DateTime<Utc>) -> Result<usize, DoctorError> {
        let changed = self.directory.deactivate_due(now).await?;
        for doctor_id in &changed {
            info!("Doctor {} deactivated on schedule", doctor_id);
        }
        Ok(changed.len())
    }
}
