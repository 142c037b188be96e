// libs/wallet-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::LedgerError;
use crate::models::{CreateTopUpOrderRequest, TopUpRecord, VerifyTopUpRequest, WalletView};
use crate::services::{LedgerService, PaymentGatewayClient};

pub struct WalletState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<LedgerService>,
    pub gateway: Option<Arc<PaymentGatewayClient>>,
}

impl WalletState {
    fn gateway(&self) -> Result<&PaymentGatewayClient, AppError> {
        self.gateway
            .as_deref()
            .ok_or_else(|| LedgerError::GatewayNotConfigured.into())
    }
}

fn principal(user: &User) -> Result<uuid::Uuid, AppError> {
    user.principal_id()
        .ok_or_else(|| AppError::Auth("Principal id is not a valid UUID".to_string()))
}

#[axum::debug_handler]
pub async fn get_wallet(
    State(state): State<Arc<WalletState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = principal(&user)?;
    let wallet = state.ledger.ensure_wallet(user_id).await?;

    Ok(Json(json!({
        "success": true,
        "wallet": WalletView::from(&wallet),
    })))
}

#[axum::debug_handler]
pub async fn create_top_up_order(
    State(state): State<Arc<WalletState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTopUpOrderRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = principal(&user)?;
    let order = state.gateway()?.create_order(user_id, request.amount).await?;

    Ok(Json(json!({
        "success": true,
        "order": order,
    })))
}

#[axum::debug_handler]
pub async fn verify_top_up(
    State(state): State<Arc<WalletState>>,
    Extension(user): Extension<User>,
    Json(request): Json<VerifyTopUpRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = principal(&user)?;
    let gateway = state.gateway()?;

    if !gateway.verify(&request.order_id, &request.payment_id, &request.signature) {
        warn!("Signature mismatch for order {} from {}", request.order_id, user_id);
        return Err(LedgerError::SignatureMismatch.into());
    }

    let order = gateway.fetch_order(&request.order_id).await?;
    if order.owner() != Some(user_id) {
        return Err(AppError::Forbidden(
            "unauthorized",
            "Order does not belong to this user".to_string(),
        ));
    }

    let wallet = state
        .ledger
        .credit_top_up(TopUpRecord {
            order_id: order.id.clone(),
            payment_id: request.payment_id,
            user_id,
            amount: order.major_amount(),
            created_at: Utc::now(),
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "wallet": WalletView::from(&wallet),
        "message": "Wallet topped up"
    })))
}
