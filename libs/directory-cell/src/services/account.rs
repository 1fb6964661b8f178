use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use shared_database::{ClinicStore, StoreError};
use shared_models::auth::Role;
use shared_models::clinic::{Staff, User};
use shared_models::error::ValidationErrors;

use crate::models::{CreateStaffRequest, DirectoryError, StaffAccount};
use crate::services::password::hash_password;

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// Staff onboarding and user administration.
pub struct AccountService {
    store: Arc<dyn ClinicStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Creates the STAFF user and its staff record in one write.
    pub async fn create_staff(&self, request: CreateStaffRequest) -> Result<StaffAccount, DirectoryError> {
        validate_staff_request(&request)?;

        if self.store.organization(request.organization_id).await?.is_none() {
            return Err(DirectoryError::NotFound("Organization".to_string()));
        }
        if let Some(department_id) = request.department_id {
            let in_org = self
                .store
                .department(department_id)
                .await?
                .is_some_and(|d| d.organization_id == request.organization_id);
            if !in_org {
                return Err(DirectoryError::NotFound("Department in this organization".to_string()));
            }
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let user = User {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            password_hash: Some(password_hash),
            role: Role::Staff,
            external_id: None,
            is_deleted: false,
            created_at: now,
        };
        let staff = Staff {
            id: Uuid::new_v4(),
            user_id: user.id,
            organization_id: request.organization_id,
            department_id: request.department_id,
            position: request.position,
            created_at: now,
        };

        let (user, staff) = self
            .store
            .insert_staff_account(user, staff)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => DirectoryError::Conflict("Email already in use".to_string()),
                other => DirectoryError::Storage(other),
            })?;

        info!("Created staff account {} for organization {}", user.id, staff.organization_id);
        Ok(StaffAccount { user, staff })
    }

    /// Visible users, most recently created first.
    pub async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn update_role(&self, user_id: Uuid, role: Role) -> Result<User, DirectoryError> {
        let user = self
            .store
            .update_user_role(user_id, role)
            .await?
            .ok_or_else(|| DirectoryError::NotFound("User".to_string()))?;

        if role == Role::Staff && self.store.staff_for_user(user_id).await?.is_none() {
            warn!("User {} promoted to STAFF without a staff record", user_id);
        }

        info!("Changed role of user {} to {}", user_id, role);
        Ok(user)
    }

    /// Soft-deletes the user together with their appointments and queue
    /// entries. Returns how many appointments were hidden.
    pub async fn deactivate_user(&self, user_id: Uuid) -> Result<u64, DirectoryError> {
        let hidden = self.store.deactivate_user(user_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => DirectoryError::NotFound("User".to_string()),
            other => DirectoryError::Storage(other),
        })?;

        info!("Deactivated user {} ({} appointments hidden)", user_id, hidden);
        Ok(hidden)
    }
}

fn validate_staff_request(request: &CreateStaffRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if request.name.trim().chars().count() < MIN_NAME_LEN {
        errors.push("name", "Name must be at least 2 characters");
    }
    let email = request.email.trim();
    if !EMAIL_PATTERN.is_match(email) || email.len() > 254 {
        errors.push("email", "Invalid email address");
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push("password", "Password must be at least 8 characters");
    }

    errors.into_result()
}
