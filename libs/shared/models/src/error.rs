use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field-level validation failures collected before any write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not Found: {message}")]
    NotFound { kind: &'static str, message: String },

    #[error("Bad Request: {message}")]
    BadRequest { kind: &'static str, message: String },

    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    #[error("Conflict: {message}")]
    Conflict { kind: &'static str, message: String },

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound { kind: "NotFound", message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest { kind: "BadRequest", message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict { kind: "Conflict", message: message.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "Unauthorized",
            AppError::Forbidden(_) => "AccessDenied",
            AppError::NotFound { kind, .. } => *kind,
            AppError::BadRequest { kind, .. } => *kind,
            AppError::ValidationError(_) => "ValidationError",
            AppError::Conflict { kind, .. } => *kind,
            AppError::Internal(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let body = match &self {
            AppError::Auth(msg) | AppError::Forbidden(msg) | AppError::Internal(msg) => {
                json!({ "error": { "kind": kind, "message": msg } })
            }
            AppError::NotFound { message, .. }
            | AppError::BadRequest { message, .. }
            | AppError::Conflict { message, .. } => {
                json!({ "error": { "kind": kind, "message": message } })
            }
            AppError::ValidationError(errors) => json!({
                "error": {
                    "kind": kind,
                    "message": errors.to_string(),
                    "fields": errors.fields(),
                }
            }),
        };

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self);
        } else {
            tracing::debug!("Rejected request: {}: {}", status, self);
        }

        (status, Json(body)).into_response()
    }
}
