use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{NewPatient, Patient, PatientRepository};
use crate::error::{AppError, AppResult};

pub async fn create_patient(
    State(state): State<AppState>,
    Json(payload): Json<NewPatient>,
) -> AppResult<(StatusCode, Json<Patient>)> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let patient = state.stores.patients.insert(&payload).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn list_patients(State(state): State<AppState>) -> AppResult<Json<Vec<Patient>>> {
    let patients = state.stores.patients.list().await?;
    Ok(Json(patients))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> AppResult<Json<Patient>> {
    let patient = state
        .stores
        .patients
        .find_by_id(patient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;
    Ok(Json(patient))
}
