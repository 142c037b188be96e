use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Modality, Reservation, ReservationStatus};
use crate::services::conflict::slots_overlap;
use crate::store::ReservationStore;

const RESERVATIONS: &str = "reservations";

/// PostgREST-backed store. The `reservations` table carries an exclusion
/// constraint over doctor, modality and slot range for blocking statuses,
/// which is what makes `insert_if_slot_free` atomic across processes.
pub struct SupabaseReservationStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseReservationStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn status_filter(statuses: &[ReservationStatus]) -> String {
    let values: Vec<String> = statuses.iter().map(|s| format!("\"{}\"", s)).collect();
    format!("status=in.({})", values.join(","))
}

#[async_trait]
impl ReservationStore for SupabaseReservationStore {
    async fn get(&self, id: Uuid) -> Result<Option<Reservation>> {
        self.supabase
            .select_one(RESERVATIONS, &format!("id=eq.{}", id))
            .await
    }

    async fn find_by_status(
        &self,
        modality: Modality,
        doctor_id: Option<Uuid>,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>> {
        let mut query_parts = vec![
            format!("details->>modality=eq.{}", modality),
            status_filter(statuses),
        ];
        if let Some(doctor_id) = doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        query_parts.push("order=created_at.asc".to_string());

        self.supabase.select(RESERVATIONS, &query_parts.join("&")).await
    }

    async fn insert_if_slot_free(&self, reservation: &Reservation, blocking: &[ReservationStatus]) -> Result<bool> {
        let slot = reservation
            .slot
            .as_ref()
            .ok_or_else(|| anyhow!("reservation {} has no slot", reservation.id))?;

        // Cheap pre-check; the table constraint settles races between processes.
        let existing = self
            .find_by_status(reservation.modality(), reservation.doctor_id, blocking)
            .await?;
        if existing
            .iter()
            .any(|r| r.slot.as_ref().is_some_and(|s| slots_overlap(s, slot)))
        {
            return Ok(false);
        }

        let inserted: Option<Vec<Reservation>> = self
            .supabase
            .insert_unless_conflict(RESERVATIONS, serde_json::to_value(reservation)?)
            .await?;
        Ok(inserted.is_some())
    }

    async fn insert(&self, reservation: &Reservation) -> Result<()> {
        let _: Vec<Reservation> = self
            .supabase
            .insert(RESERVATIONS, serde_json::to_value(reservation)?)
            .await?;
        Ok(())
    }

    async fn compare_and_swap(&self, expected_version: i64, next: &Reservation) -> Result<bool> {
        let filters = format!("id=eq.{}&version=eq.{}", next.id, expected_version);
        let body = json!({
            "doctor_id": next.doctor_id,
            "status": next.status,
            "payment": next.payment,
            "otp": next.otp,
            "details": next.details,
            "version": next.version,
            "updated_at": next.updated_at,
        });

        let rows: Vec<Reservation> = self.supabase.update_where(RESERVATIONS, &filters, body).await?;
        if rows.is_empty() {
            debug!("Stale reservation write for {} at version {}", next.id, expected_version);
        }
        Ok(!rows.is_empty())
    }
}
