use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::auth::Role;
use shared_models::clinic::{OrganizationType, Staff, User};
use shared_models::error::{AppError, ValidationErrors};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OrganizationType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub organization_id: Uuid,
    pub slot_duration_minutes: u32,
    pub max_appointments_per_slot: u32,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub slot_duration_minutes: Option<u32>,
    pub max_appointments_per_slot: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub email: Option<String>,
    pub specialization: String,
    pub organization_id: Uuid,
    pub department_id: Uuid,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialization: Option<String>,
    pub department_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchQuery {
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub organization_id: Uuid,
    /// `None` gives the staff member the whole organization.
    pub department_id: Option<Uuid>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StaffAccount {
    pub user: User,
    pub staff: Staff,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<ValidationErrors> for DirectoryError {
    fn from(errors: ValidationErrors) -> Self {
        DirectoryError::Validation(errors)
    }
}

impl From<argon2::password_hash::Error> for DirectoryError {
    fn from(err: argon2::password_hash::Error) -> Self {
        DirectoryError::PasswordHash(err.to_string())
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        let message = err.to_string();
        match err {
            DirectoryError::Validation(errors) => AppError::ValidationError(errors),
            DirectoryError::NotFound(_) => AppError::not_found(message),
            DirectoryError::Conflict(_) => AppError::conflict(message),
            DirectoryError::PasswordHash(e) => {
                tracing::error!("Password hashing failed: {}", e);
                AppError::Internal("Failed to create account".to_string())
            }
            DirectoryError::Storage(StoreError::UniqueViolation(what)) => {
                AppError::conflict(format!("Already in use: {}", what))
            }
            DirectoryError::Storage(StoreError::NotFound(what)) => AppError::not_found(what),
            DirectoryError::Storage(e) => {
                tracing::error!("Directory storage failure: {}", e);
                AppError::Internal("Directory operation failed".to_string())
            }
        }
    }
}
