// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, BookEmergencyRequest, BookHomeVisitRequest, BookSlotRequest, CompleteWithOtpRequest,
    ConflictCheckQuery, DoctorAcceptRequest,
};
use crate::services::{Actor, AppointmentService, ExpirySweeper};

pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AppointmentService>,
    pub sweeper: Arc<ExpirySweeper>,
}

fn actor(user: &User) -> Result<Actor, AppError> {
    Actor::from_user(user).map_err(|e| AppError::Auth(e.to_string()))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_online(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.book_online(&actor, request, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Online consultation requested"
    })))
}

#[axum::debug_handler]
pub async fn book_clinic(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.book_clinic(&actor, request, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Clinic visit requested"
    })))
}

#[axum::debug_handler]
pub async fn book_home_visit(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookHomeVisitRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.book_home_visit(&actor, request, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Home visit requested, awaiting the doctor's travel quote"
    })))
}

#[axum::debug_handler]
pub async fn book_emergency(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookEmergencyRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.book_emergency(&actor, request, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Emergency request raised"
    })))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_reservation(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.get(&actor, reservation_id).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation
    })))
}

#[axum::debug_handler]
pub async fn accept(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.accept(&actor, reservation_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation
    })))
}

#[axum::debug_handler]
pub async fn doctor_accept(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<DoctorAcceptRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state
        .service
        .doctor_accept_home_visit(&actor, reservation_id, request.travel_cost, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Travel cost sent to the patient"
    })))
}

#[axum::debug_handler]
pub async fn reject(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.reject(&actor, reservation_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation
    })))
}

#[axum::debug_handler]
pub async fn patient_confirm(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.patient_confirm(&actor, reservation_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Home visit confirmed, funds reserved"
    })))
}

#[axum::debug_handler]
pub async fn cancel(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.cancel(&actor, reservation_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Reservation cancelled"
    })))
}

/// A mismatch answers 409 with the attempts left so the client can show them.
#[axum::debug_handler]
pub async fn complete_with_otp(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteWithOtpRequest>,
) -> Response {
    let actor = match actor(&user) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };

    match state
        .service
        .complete_with_otp(&actor, reservation_id, &request.otp, Utc::now())
        .await
    {
        Ok(reservation) => Json(json!({
            "success": true,
            "reservation": reservation,
            "message": "Appointment completed"
        }))
        .into_response(),
        Err(AppointmentError::OtpMismatch { remaining_attempts }) => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "action": "otp-mismatch",
                "error": format!("OTP does not match, {} attempts remaining", remaining_attempts),
                "remaining_attempts": remaining_attempts
            })),
        )
            .into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

#[axum::debug_handler]
pub async fn join(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let joined = state.service.join(&actor, reservation_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": joined.reservation,
        "room_name": joined.room_name,
        "access_token": joined.access_token
    })))
}

#[axum::debug_handler]
pub async fn respond_emergency(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.respond_emergency(&actor, reservation_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation
    })))
}

#[axum::debug_handler]
pub async fn finalize_emergency(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let reservation = state.service.finalize_emergency(&actor, reservation_id, Utc::now()).await?;

    Ok(Json(json!({
        "success": true,
        "reservation": reservation,
        "message": "Emergency consultation closed"
    })))
}

#[axum::debug_handler]
pub async fn reveal_otp(
    State(state): State<Arc<AppointmentState>>,
    Path(reservation_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = actor(&user)?;
    let otp = state.service.reveal_otp(&actor, reservation_id).await?;

    Ok(Json(json!({
        "success": true,
        "otp": otp
    })))
}

// ==============================================================================
// UTILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn check_conflicts(
    State(state): State<Arc<AppointmentState>>,
    Query(query): Query<ConflictCheckQuery>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let conflicts = state.service.check_conflicts(&query).await?;

    Ok(Json(json!({
        "success": true,
        "has_conflict": !conflicts.is_empty(),
        "conflicting_reservation_ids": conflicts.iter().map(|r| r.id).collect::<Vec<_>>()
    })))
}

/// Runs one sweep immediately. Admin only.
#[axum::debug_handler]
pub async fn run_sweep(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("unauthorized", "Only admins can trigger a sweep".to_string()));
    }

    let report = state.sweeper.sweep_all(Utc::now()).await;
    info!("Manual sweep by {}: {:?}", user.id, report.total);

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}
