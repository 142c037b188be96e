use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use wallet_cell::router::wallet_routes;

use crate::wiring::Cells;

pub fn create_router(cells: &Cells) -> Router {
    let backend = format!("{:?}", cells.config.storage_backend).to_lowercase();

    Router::new()
        .route("/", get(|| async { "Telehealth API is running!" }))
        .route(
            "/health",
            get(move || {
                let backend = backend.clone();
                async move { Json::<Value>(json!({ "status": "ok", "storage": backend })) }
            }),
        )
        .nest("/wallet", wallet_routes(cells.wallet.clone()))
        .nest("/appointments", appointment_routes(cells.appointments.clone()))
}
