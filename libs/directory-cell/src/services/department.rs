use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::clinic::Department;
use shared_models::error::ValidationErrors;

use crate::models::{CreateDepartmentRequest, DirectoryError, UpdateDepartmentRequest};

/// A slot may not outlast the 09:00-17:00 working day.
pub const MAX_SLOT_DURATION_MINUTES: u32 = 8 * 60;

pub struct DepartmentService {
    store: Arc<dyn ClinicStore>,
}

impl DepartmentService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateDepartmentRequest) -> Result<Department, DirectoryError> {
        let mut errors = ValidationErrors::new();
        if request.name.trim().is_empty() {
            errors.push("name", "Department name is required");
        }
        check_grid(&mut errors, Some(request.slot_duration_minutes), Some(request.max_appointments_per_slot));
        errors.into_result()?;

        if self.store.organization(request.organization_id).await?.is_none() {
            return Err(DirectoryError::NotFound("Organization".to_string()));
        }

        let department = self
            .store
            .insert_department(Department {
                id: Uuid::new_v4(),
                name: request.name.trim().to_string(),
                organization_id: request.organization_id,
                slot_duration_minutes: request.slot_duration_minutes,
                max_appointments_per_slot: request.max_appointments_per_slot,
                is_deleted: false,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            "Created department {} in organization {} ({} min slots, {} per slot)",
            department.id,
            department.organization_id,
            department.slot_duration_minutes,
            department.max_appointments_per_slot
        );
        Ok(department)
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<Department>, DirectoryError> {
        Ok(self.store.list_departments(organization_id).await?)
    }

    /// Applies the present fields only. Existing bookings keep their slot
    /// labels when the grid changes.
    pub async fn update(
        &self,
        department_id: Uuid,
        request: UpdateDepartmentRequest,
    ) -> Result<Department, DirectoryError> {
        let mut errors = ValidationErrors::new();
        if request.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            errors.push("name", "Department name cannot be empty");
        }
        check_grid(&mut errors, request.slot_duration_minutes, request.max_appointments_per_slot);
        errors.into_result()?;

        let mut department = self
            .store
            .department(department_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound("Department".to_string()))?;

        if let Some(name) = request.name {
            department.name = name.trim().to_string();
        }
        if let Some(minutes) = request.slot_duration_minutes {
            department.slot_duration_minutes = minutes;
        }
        if let Some(max) = request.max_appointments_per_slot {
            department.max_appointments_per_slot = max;
        }

        let department = self.store.update_department(department).await?;
        debug!("Updated department {}", department.id);
        Ok(department)
    }

    pub async fn delete(&self, department_id: Uuid) -> Result<(), DirectoryError> {
        if !self.store.soft_delete_department(department_id).await? {
            return Err(DirectoryError::NotFound("Department".to_string()));
        }

        info!("Soft-deleted department {}", department_id);
        Ok(())
    }
}

fn check_grid(errors: &mut ValidationErrors, slot_duration: Option<u32>, max_per_slot: Option<u32>) {
    match slot_duration {
        Some(0) => errors.push("slot_duration_minutes", "Slot duration must be at least 1 minute"),
        Some(minutes) if minutes > MAX_SLOT_DURATION_MINUTES => errors.push(
            "slot_duration_minutes",
            format!("Slot duration cannot exceed {} minutes", MAX_SLOT_DURATION_MINUTES),
        ),
        _ => {}
    }
    if max_per_slot == Some(0) {
        errors.push("max_appointments_per_slot", "Max appointments must be at least 1");
    }
}
