use axum::{routing::get, Json, Router};
use serde_json::json;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;

use crate::{
    app_state::AppState,
    modules::{
        appointments::routes::appointment_routes, doctors::routes::doctor_routes,
        patients::routes::patient_routes,
    },
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/api/appointments", appointment_routes())
        .nest("/api/doctors", doctor_routes())
        .nest("/api/patients", patient_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn hello() -> &'static str {
    "Clinic Scheduler says hello!\n"
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let db_result = sqlx::query("SELECT 1").execute(&state.db).await;

    let db_status = match db_result {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    Json(json!({
        "status": "ok",
        "timestamp": OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
        }
    }))
}
