use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::clinic::Organization;
use shared_models::error::ValidationErrors;

use crate::models::{CreateOrganizationRequest, DirectoryError};

pub struct OrganizationService {
    store: Arc<dyn ClinicStore>,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateOrganizationRequest) -> Result<Organization, DirectoryError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ValidationErrors::single("name", "Organization name is required").into());
        }

        let organization = self
            .store
            .insert_organization(Organization {
                id: Uuid::new_v4(),
                name: name.to_string(),
                kind: request.kind,
                is_deleted: false,
                created_at: Utc::now(),
            })
            .await?;

        info!("Created organization {} ({})", organization.name, organization.id);
        Ok(organization)
    }

    /// Visible organizations ordered by name.
    pub async fn list(&self) -> Result<Vec<Organization>, DirectoryError> {
        Ok(self.store.list_organizations().await?)
    }

    pub async fn delete(&self, organization_id: Uuid) -> Result<(), DirectoryError> {
        if !self.store.soft_delete_organization(organization_id).await? {
            return Err(DirectoryError::NotFound("Organization".to_string()));
        }

        info!("Soft-deleted organization {}", organization_id);
        Ok(())
    }
}
