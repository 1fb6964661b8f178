use std::sync::Arc;

use tracing::debug;

use shared_database::{AppointmentFilter, AppointmentOrder, ClinicStore};
use shared_models::appointment::Appointment;
use shared_models::auth::Actor;

use crate::models::{AppointmentError, AppointmentSearchQuery};

pub struct HistoryService {
    store: Arc<dyn ClinicStore>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// The caller's own appointments, newest first. Cancelled ones are
    /// included.
    pub async fn my_appointments(&self, actor: &Actor) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter::new().for_user(actor.user_id());
        let appointments = self
            .store
            .list_appointments(&filter, AppointmentOrder::NewestFirst)
            .await?;

        debug!("Found {} appointments for user {}", appointments.len(), actor.user_id());
        Ok(appointments)
    }

    /// Every visible appointment, newest first. Admin only.
    pub async fn all_appointments(
        &self,
        actor: &Actor,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !matches!(actor, Actor::Admin { .. }) {
            return Err(AppointmentError::AccessDenied("Admin role required".to_string()));
        }

        let mut filter = AppointmentFilter::new().department(query.department_id);
        if let Some(organization_id) = query.organization_id {
            filter = filter.organization(organization_id);
        }
        if let Some(date) = query.date {
            filter = filter.on(date);
        }
        if let Some(status) = query.status {
            filter = filter.with_status(status);
        }

        Ok(self
            .store
            .list_appointments(&filter, AppointmentOrder::NewestFirst)
            .await?)
    }
}
