use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::appointment::AppointmentStatus;
use shared_models::error::{AppError, ValidationErrors};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Booking request. Patients book for themselves; staff and admins name
/// either a registered `user_id` or a walk-in `patient_name` +
/// `patient_phone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
    /// `HH:MM` on the department's slot grid. Ignored for emergencies.
    pub time_slot: Option<String>,
    pub user_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    #[serde(default)]
    pub is_emergency: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailableDatesQuery {
    pub from: Option<NaiveDate>,
    pub days: Option<u32>,
    pub doctor_id: Option<Uuid>,
}

/// Admin listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentSearchQuery {
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub time_slot: String,
    pub remaining: u32,
    pub available: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Patient already has an active appointment in this department on this date")]
    DuplicateBooking,

    #[error("Department not found or inactive")]
    DepartmentUnavailable,

    #[error("Doctor not found, inactive or not in this department")]
    DoctorUnavailable,

    #[error("Time slot {time_slot} is fully booked")]
    SlotFull { time_slot: String },

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<ValidationErrors> for AppointmentError {
    fn from(errors: ValidationErrors) -> Self {
        AppointmentError::Validation(errors)
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::Validation(errors) => AppError::ValidationError(errors),
            AppointmentError::NotFound(_) => AppError::not_found(message),
            AppointmentError::DuplicateBooking => AppError::Conflict { kind: "DuplicateBooking", message },
            AppointmentError::DepartmentUnavailable => {
                AppError::NotFound { kind: "DepartmentUnavailable", message }
            }
            AppointmentError::DoctorUnavailable => {
                AppError::BadRequest { kind: "DoctorUnavailable", message }
            }
            AppointmentError::SlotFull { .. } => AppError::Conflict { kind: "SlotFull", message },
            AppointmentError::InvalidTransition { .. } => {
                AppError::BadRequest { kind: "InvalidTransition", message }
            }
            AppointmentError::AccessDenied(reason) => AppError::Forbidden(reason),
            AppointmentError::Conflict(_) => AppError::conflict(message),
            AppointmentError::Storage(e) => {
                tracing::error!("Appointment storage failure: {}", e);
                AppError::Internal("Appointment operation failed".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn admission_errors_keep_their_kind() {
        let slot_full = AppError::from(AppointmentError::SlotFull { time_slot: "09:00".into() });
        assert_eq!(slot_full.kind(), "SlotFull");
        assert_eq!(slot_full.status(), StatusCode::CONFLICT);

        let duplicate = AppError::from(AppointmentError::DuplicateBooking);
        assert_eq!(duplicate.kind(), "DuplicateBooking");

        let transition = AppError::from(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Cancelled,
            to: AppointmentStatus::Cancelled,
        });
        assert_eq!(transition.kind(), "InvalidTransition");
        assert_eq!(transition.to_string(), "Bad Request: Cannot move appointment from CANCELLED to CANCELLED");
    }

    #[test]
    fn emergency_flag_defaults_to_false() {
        let request: BookAppointmentRequest = serde_json::from_value(serde_json::json!({
            "organization_id": Uuid::new_v4(),
            "department_id": Uuid::new_v4(),
            "date": "2030-03-14",
            "time_slot": "09:30"
        }))
        .unwrap();

        assert!(!request.is_emergency);
        assert!(request.user_id.is_none());
    }
}
