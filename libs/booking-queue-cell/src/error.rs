use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::{AppError, ValidationErrors};

#[derive(Error, Debug)]
pub enum BookingQueueError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("No booked appointment is waiting in this queue")]
    QueueEmpty,

    #[error("Queue is paused")]
    QueuePaused,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<BookingQueueError> for AppError {
    fn from(err: BookingQueueError) -> Self {
        match err {
            BookingQueueError::Validation(errors) => AppError::ValidationError(errors),
            BookingQueueError::NotFound(message) => AppError::not_found(message),
            BookingQueueError::AccessDenied(message) => AppError::Forbidden(message),
            BookingQueueError::QueueEmpty => AppError::NotFound {
                kind: "QueueEmpty",
                message: "No booked appointment is waiting in this queue".to_string(),
            },
            BookingQueueError::QueuePaused => AppError::Conflict {
                kind: "QueuePaused",
                message: "Queue is paused; resume it before calling the next token".to_string(),
            },
            BookingQueueError::Storage(e) => {
                tracing::error!("Queue storage failure: {}", e);
                AppError::Internal("Queue operation failed".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn queue_errors_map_to_http_kinds() {
        assert_eq!(AppError::from(BookingQueueError::QueueEmpty).kind(), "QueueEmpty");
        assert_eq!(AppError::from(BookingQueueError::QueuePaused).kind(), "QueuePaused");
        assert_matches!(
            AppError::from(BookingQueueError::AccessDenied("other org".into())),
            AppError::Forbidden(_)
        );
        assert_matches!(
            AppError::from(BookingQueueError::Storage(StoreError::Unavailable("down".into()))),
            AppError::Internal(_)
        );
    }

    #[test]
    fn lookup_and_input_errors_are_client_errors() {
        let mut errors = ValidationErrors::new();
        errors.push("date", "Invalid date");
        assert_matches!(
            AppError::from(BookingQueueError::Validation(errors)),
            AppError::ValidationError(e) if e.fields().len() == 1
        );
        assert_eq!(
            AppError::from(BookingQueueError::NotFound("Appointment".into())).status(),
            axum::http::StatusCode::NOT_FOUND
        );
    }
}
