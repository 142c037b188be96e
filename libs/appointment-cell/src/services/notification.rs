// libs/appointment-cell/src/services/notification.rs
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::models::Reservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationEvent {
    BookingCreated,
    StatusChanged,
    TravelCostAdded,
}

/// Outbound notification channel (SMS, push, email behind a relay).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent, payload: Value) -> Result<()>;
}

/// Posts every event to a relay webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: NotificationEvent, payload: Value) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "event": event, "payload": payload }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("notification relay returned {}", response.status()));
        }
        Ok(())
    }
}

/// Used when no relay is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: NotificationEvent, payload: Value) -> Result<()> {
        info!("Notification {:?}: {}", event, payload);
        Ok(())
    }
}

pub fn reservation_payload(reservation: &Reservation) -> Value {
    json!({
        "reservation_id": reservation.id,
        "modality": reservation.modality(),
        "status": reservation.status,
        "patient_id": reservation.patient_id,
        "doctor_id": reservation.doctor_id,
        "gross_amount": reservation.payment.gross_amount,
    })
}

/// Fire and forget. Delivery failures are logged and never reach the caller.
pub fn dispatch(notifier: &Arc<dyn Notifier>, event: NotificationEvent, reservation: &Reservation) {
    let notifier = Arc::clone(notifier);
    let payload = reservation_payload(reservation);
    let reservation_id = reservation.id;

    tokio::spawn(async move {
        match notifier.notify(event, payload).await {
            Ok(()) => debug!("Sent {:?} for reservation {}", event, reservation_id),
            Err(e) => warn!("Failed to send {:?} for reservation {}: {}", event, reservation_id, e),
        }
    });
}
