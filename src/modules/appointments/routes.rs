use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{
    appointment_history, cancel_appointment, create_appointment, delete_appointment,
    get_appointment, list_appointments, reschedule_appointment, upcoming_appointments,
    update_appointment,
};

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_appointment).get(list_appointments))
        .route(
            "/{id}",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/{id}/cancel", post(cancel_appointment))
        .route("/{id}/reschedule", post(reschedule_appointment))
        .route("/upcoming/{patient_id}", get(upcoming_appointments))
        .route("/history/{patient_id}", get(appointment_history))
}
