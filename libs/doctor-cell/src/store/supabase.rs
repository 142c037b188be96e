use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorSubscription};
use crate::store::DoctorDirectory;

const DOCTORS: &str = "doctors";
const SUBSCRIPTIONS: &str = "doctor_subscriptions";

#[derive(Deserialize)]
struct DoctorIdRow {
    id: Uuid,
}

pub struct SupabaseDoctorDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Option<Doctor>> {
        self.supabase
            .select_one(DOCTORS, &format!("id=eq.{}", doctor_id))
            .await
    }

    async fn subscriptions(&self, doctor_id: Uuid) -> Result<Vec<DoctorSubscription>> {
        // Plan rows are embedded through the plan_id foreign key.
        let query = format!(
            "doctor_id=eq.{}&select=id,doctor_id,start_date,end_date,plan:subscription_plans(*)&order=start_date.desc",
            doctor_id
        );
        self.supabase.select(SUBSCRIPTIONS, &query).await
    }

    async fn deactivate_due(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let cutoff = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let filters = format!(
            "is_active=eq.true&deactivate_at=lte.{}&select=id",
            urlencoding::encode(&cutoff)
        );
        let rows: Vec<DoctorIdRow> = self
            .supabase
            .update_where(
                DOCTORS,
                &filters,
                json!({ "is_active": false, "updated_at": now }),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }
}
