// libs/wallet-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, WalletState};

pub fn wallet_routes(state: Arc<WalletState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_wallet))
        .route("/orders", post(handlers::create_top_up_order))
        .route("/orders/verify", post(handlers::verify_top_up))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
