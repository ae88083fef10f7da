use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{
    add_doctor_schedule, create_doctor, get_doctor, get_doctor_schedule, list_doctors,
};

pub fn doctor_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_doctor).get(list_doctors))
        .route("/{id}", get(get_doctor))
        .route(
            "/{id}/schedule",
            get(get_doctor_schedule).post(add_doctor_schedule),
        )
}
