// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        // Booking, one entry per modality
        .route("/online", post(handlers::book_online))
        .route("/clinic", post(handlers::book_clinic))
        .route("/home-visit", post(handlers::book_home_visit))
        .route("/emergency", post(handlers::book_emergency))

        // Lifecycle
        .route("/{reservation_id}", get(handlers::get_reservation))
        .route("/{reservation_id}/accept", post(handlers::accept))
        .route("/{reservation_id}/doctor-accept", post(handlers::doctor_accept))
        .route("/{reservation_id}/reject", post(handlers::reject))
        .route("/{reservation_id}/confirm", post(handlers::patient_confirm))
        .route("/{reservation_id}/cancel", post(handlers::cancel))
        .route("/{reservation_id}/complete", post(handlers::complete_with_otp))
        .route("/{reservation_id}/join", post(handlers::join))
        .route("/{reservation_id}/respond", post(handlers::respond_emergency))
        .route("/{reservation_id}/finalize", post(handlers::finalize_emergency))
        .route("/{reservation_id}/otp", get(handlers::reveal_otp))

        // Utility
        .route("/conflicts/check", get(handlers::check_conflicts))
        .route("/admin/sweep", post(handlers::run_sweep))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
