// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AppointmentStatus, CancelAppointmentRequest, ConflictCheckQuery,
    RescheduleAppointmentRequest, ScheduleAppointmentRequest, SchedulingError,
    StatusTransitionRequest,
};
use crate::services::scheduling::SchedulingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DoctorDayQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let appointment = service
        .schedule(request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment scheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let appointment = service
        .reschedule(appointment_id, request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn transition_appointment_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<StatusTransitionRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let appointment = service
        .transition_status(appointment_id, request, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment status updated"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let transition = StatusTransitionRequest {
        new_status: AppointmentStatus::Cancelled,
        reason: Some(request.reason),
    };

    let appointment = service
        .transition_status(appointment_id, transition, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let response = service
        .check_conflicts(query, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<DoctorDayQuery>,
) -> Result<Json<Value>, AppError> {
    let service = SchedulingService::new(&state);

    let appointments = service
        .list_doctor_day(doctor_id, query.date, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    let count = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "count": count
    })))
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

fn map_scheduling_error(error: SchedulingError) -> AppError {
    match error {
        SchedulingError::Validation(violations) => {
            AppError::Validation(violations.iter().map(ToString::to_string).collect())
        }
        SchedulingError::Conflict(conflicts) => AppError::Conflict {
            message: "Appointment conflicts with existing booking".to_string(),
            conflicts: conflicts.iter().map(|c| json!(c)).collect(),
        },
        SchedulingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        SchedulingError::InvalidStatusTransition { from, to } => {
            AppError::BadRequest(format!("Cannot transition appointment from {} to {}", from, to))
        }
        SchedulingError::NotReschedulable(status) => {
            AppError::BadRequest(format!("Appointment in status {} cannot be rescheduled", status))
        }
        SchedulingError::Database(msg) => AppError::Database(msg),
    }
}
