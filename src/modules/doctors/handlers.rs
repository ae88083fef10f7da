use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use time::Date;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{Doctor, DoctorRepository, NewDoctor};
use crate::error::{AppError, AppResult};
use crate::services::DoctorScheduleView;

pub async fn create_doctor(
    State(state): State<AppState>,
    Json(payload): Json<NewDoctor>,
) -> AppResult<(StatusCode, Json<Doctor>)> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let doctor = state.stores.doctors.insert(&payload).await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

pub async fn list_doctors(State(state): State<AppState>) -> AppResult<Json<Vec<Doctor>>> {
    let doctors = state.stores.doctors.list().await?;
    Ok(Json(doctors))
}

pub async fn get_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> AppResult<Json<Doctor>> {
    let doctor = state
        .stores
        .doctors
        .find_by_id(doctor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Doctor not found".to_string()))?;
    Ok(Json(doctor))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub date: Date,
}

pub async fn get_doctor_schedule(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<ScheduleQuery>,
) -> AppResult<Json<DoctorScheduleView>> {
    let view = state
        .scheduler
        .get_doctor_schedule(doctor_id, query.date)
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct AddScheduleRequest {
    pub date: Date,
    pub slots: Vec<String>,
}

pub async fn add_doctor_schedule(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Json(payload): Json<AddScheduleRequest>,
) -> AppResult<Json<DoctorScheduleView>> {
    if payload.slots.is_empty() {
        return Err(AppError::Validation(
            "At least one slot is required".to_string(),
        ));
    }
    let view = state
        .scheduler
        .add_doctor_schedule(doctor_id, payload.date, payload.slots)
        .await?;
    Ok(Json(view))
}
