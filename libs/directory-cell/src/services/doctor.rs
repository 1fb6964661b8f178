use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{ClinicStore, DoctorQuery};
use shared_models::clinic::{Department, Doctor};
use shared_models::error::ValidationErrors;

use crate::models::{CreateDoctorRequest, DirectoryError, DoctorSearchQuery, UpdateDoctorRequest};

pub struct DoctorService {
    store: Arc<dyn ClinicStore>,
}

impl DoctorService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Create a new doctor in a department of the given organization.
    pub async fn create(&self, request: CreateDoctorRequest) -> Result<Doctor, DirectoryError> {
        let mut errors = ValidationErrors::new();
        if request.name.trim().is_empty() {
            errors.push("name", "Doctor name is required");
        }
        if request.specialization.trim().is_empty() {
            errors.push("specialization", "Specialization is required");
        }
        errors.into_result()?;

        if self.store.organization(request.organization_id).await?.is_none() {
            return Err(DirectoryError::NotFound("Organization".to_string()));
        }
        self.department_in(request.organization_id, request.department_id).await?;

        let doctor = self
            .store
            .insert_doctor(Doctor {
                id: Uuid::new_v4(),
                name: request.name.trim().to_string(),
                email: request.email,
                specialization: request.specialization.trim().to_string(),
                organization_id: request.organization_id,
                department_id: request.department_id,
                is_active: request.is_active.unwrap_or(true),
                is_deleted: false,
                created_at: Utc::now(),
            })
            .await?;

        info!("Created doctor {} in department {}", doctor.id, doctor.department_id);
        Ok(doctor)
    }

    /// Visible doctors ordered by name. `search` is a case-insensitive
    /// substring of the name.
    pub async fn search(&self, query: DoctorSearchQuery) -> Result<Vec<Doctor>, DirectoryError> {
        let query = DoctorQuery {
            organization_id: query.organization_id,
            department_id: query.department_id,
            name_contains: query.search.filter(|s| !s.trim().is_empty()),
        };

        let doctors = self.store.list_doctors(&query).await?;
        debug!("Doctor search returned {} results", doctors.len());
        Ok(doctors)
    }

    pub async fn get(&self, doctor_id: Uuid) -> Result<Doctor, DirectoryError> {
        self.store
            .doctor(doctor_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound("Doctor".to_string()))
    }

    /// Moving a doctor keeps them inside their organization.
    pub async fn update(&self, doctor_id: Uuid, request: UpdateDoctorRequest) -> Result<Doctor, DirectoryError> {
        let mut errors = ValidationErrors::new();
        if request.name.as_deref().is_some_and(|s| s.trim().is_empty()) {
            errors.push("name", "Doctor name cannot be empty");
        }
        if request.specialization.as_deref().is_some_and(|s| s.trim().is_empty()) {
            errors.push("specialization", "Specialization cannot be empty");
        }
        errors.into_result()?;

        let mut doctor = self.get(doctor_id).await?;

        if let Some(department_id) = request.department_id {
            self.department_in(doctor.organization_id, department_id).await?;
            doctor.department_id = department_id;
        }
        if let Some(name) = request.name {
            doctor.name = name.trim().to_string();
        }
        if let Some(specialization) = request.specialization {
            doctor.specialization = specialization.trim().to_string();
        }
        if request.email.is_some() {
            doctor.email = request.email;
        }
        if let Some(is_active) = request.is_active {
            doctor.is_active = is_active;
        }

        let doctor = self.store.update_doctor(doctor).await?;
        debug!("Updated doctor {}", doctor.id);
        Ok(doctor)
    }

    pub async fn delete(&self, doctor_id: Uuid) -> Result<(), DirectoryError> {
        if !self.store.soft_delete_doctor(doctor_id).await? {
            return Err(DirectoryError::NotFound("Doctor".to_string()));
        }

        info!("Soft-deleted doctor {}", doctor_id);
        Ok(())
    }

    async fn department_in(&self, organization_id: Uuid, department_id: Uuid) -> Result<Department, DirectoryError> {
        self.store
            .department(department_id)
            .await?
            .filter(|d| d.organization_id == organization_id)
            .ok_or_else(|| DirectoryError::NotFound("Department in this organization".to_string()))
    }
}
