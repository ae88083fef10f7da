use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{create_patient, get_patient, list_patients};

pub fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_patient).get(list_patients))
        .route("/{id}", get(get_patient))
}
