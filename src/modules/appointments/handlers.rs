use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use time::macros::time;
use time::Date;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{
    AppointmentFilter, AppointmentStatus, CancelAppointmentRequest, NewAppointment,
    RescheduleAppointmentRequest, UpdateAppointmentPayload,
};
use crate::error::{AppError, AppResult};
use crate::services::AppointmentDetails;

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(payload): Json<NewAppointment>,
) -> AppResult<(StatusCode, Json<AppointmentDetails>)> {
    let details = state.scheduler.create_appointment(payload).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<AppointmentListQuery>,
) -> AppResult<Json<Vec<AppointmentDetails>>> {
    let filter = AppointmentFilter {
        patient_id: query.patient_id,
        doctor_id: query.doctor_id,
        statuses: query.status.map(|status| vec![status]),
        from_date: query
            .start_date
            .map(|date| date.midnight().assume_utc()),
        to_date: query
            .end_date
            .map(|date| date.with_time(time!(23:59:59)).assume_utc()),
        ascending: false,
    };
    let appointments = state.scheduler.get_all_appointments(filter).await?;
    Ok(Json(appointments))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> AppResult<Json<AppointmentDetails>> {
    let details = state.scheduler.get_appointment(appointment_id).await?;
    Ok(Json(details))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentPayload>,
) -> AppResult<Json<AppointmentDetails>> {
    let details = state
        .scheduler
        .update_appointment(appointment_id, payload)
        .await?;
    Ok(Json(details))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.scheduler.delete_appointment(appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<CancelAppointmentRequest>,
) -> AppResult<Json<AppointmentDetails>> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let details = state
        .scheduler
        .cancel_appointment(appointment_id, payload.reason, payload.cancelled_by)
        .await?;
    Ok(Json(details))
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<RescheduleAppointmentRequest>,
) -> AppResult<Json<AppointmentDetails>> {
    let details = state
        .scheduler
        .reschedule_appointment(appointment_id, payload.new_date, payload.new_time_slot)
        .await?;
    Ok(Json(details))
}

pub async fn upcoming_appointments(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> AppResult<Json<Vec<AppointmentDetails>>> {
    let appointments = state.scheduler.get_upcoming_appointments(patient_id).await?;
    Ok(Json(appointments))
}

pub async fn appointment_history(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> AppResult<Json<Vec<AppointmentDetails>>> {
    let appointments = state.scheduler.get_appointment_history(patient_id).await?;
    Ok(Json(appointments))
}
