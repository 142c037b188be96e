use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Doctor, DoctorSubscription};
use crate::store::DoctorDirectory;

#[derive(Default)]
pub struct MemoryDoctorDirectory {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
    subscriptions: RwLock<Vec<DoctorSubscription>>,
}

impl MemoryDoctorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_doctor(&self, doctor: Doctor) {
        self.doctors.write().await.insert(doctor.id, doctor);
    }

    pub async fn put_subscription(&self, subscription: DoctorSubscription) {
        self.subscriptions.write().await.push(subscription);
    }
}

#[async_trait]
impl DoctorDirectory for MemoryDoctorDirectory {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        Ok(self.doctors.read().await.get(&doctor_id).cloned())
    }

    async fn subscriptions(&self, doctor_id: Uuid) -> Result<Vec<DoctorSubscription>> {
        Ok(self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| s.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    async fn deactivate_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let mut doctors = self.doctors.write().await;
        let mut changed = Vec::new();
        for doctor in doctors.values_mut() {
            if doctor.is_active && doctor.deactivate_at.is_some_and(|at| at <= now) {
                doctor.is_active = false;
                doctor.updated_at = now;
                changed.push(doctor.id);
            }
        }
        Ok(changed)
    }
}
