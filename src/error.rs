use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Inactive resource: {0}")]
    InactiveResource(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Booking conflict: {0}")]
    BookingConflict(String),

    #[error("Already cancelled: {0}")]
    AlreadyCancelled(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref err) => match err {
                DatabaseError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
                DatabaseError::Duplicate => (StatusCode::CONFLICT, "Resource already exists"),
                DatabaseError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input data"),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                ),
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
            AppError::InactiveResource(_) => (StatusCode::CONFLICT, "Resource is inactive"),
            AppError::SlotUnavailable(_) => (StatusCode::CONFLICT, "Time slot is not available"),
            AppError::BookingConflict(_) => {
                (StatusCode::CONFLICT, "Slot was booked concurrently, pick another slot")
            }
            AppError::AlreadyCancelled(_) => {
                (StatusCode::CONFLICT, "Appointment is already cancelled")
            }
            AppError::InvalidState(_) => {
                (StatusCode::CONFLICT, "Operation not allowed in the current status")
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn conflict_kinds_map_to_409() {
        for err in [
            AppError::SlotUnavailable("taken".to_string()),
            AppError::BookingConflict("raced".to_string()),
            AppError::AlreadyCancelled("done".to_string()),
            AppError::InvalidState("completed".to_string()),
            AppError::InactiveResource("inactive".to_string()),
        ] {
            assert_eq!(status_of(err), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            status_of(AppError::Validation("too short".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::NotFound("missing".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn database_errors_map_through() {
        assert_eq!(
            status_of(DatabaseError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DatabaseError::Duplicate.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DatabaseError::ConnectionError("pool exhausted".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
