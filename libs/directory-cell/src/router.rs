use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{AccountService, DepartmentService, DoctorService, OrganizationService};

#[derive(Clone)]
pub struct DirectoryState {
    pub config: Arc<AppConfig>,
    pub organizations: Arc<OrganizationService>,
    pub departments: Arc<DepartmentService>,
    pub doctors: Arc<DoctorService>,
    pub accounts: Arc<AccountService>,
}

impl DirectoryState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn ClinicStore>) -> Self {
        Self {
            config,
            organizations: Arc::new(OrganizationService::new(store.clone())),
            departments: Arc::new(DepartmentService::new(store.clone())),
            doctors: Arc::new(DoctorService::new(store.clone())),
            accounts: Arc::new(AccountService::new(store)),
        }
    }
}

/// Admin directory management, mounted under `/admin`. Every handler
/// requires the ADMIN role.
pub fn create_directory_router(state: DirectoryState) -> Router {
    Router::new()
        // Organizations
        .route("/organizations", post(handlers::create_organization).get(handlers::list_organizations))
        .route("/organizations/{organization_id}", delete(handlers::delete_organization))
        .route("/organizations/{organization_id}/departments", get(handlers::list_departments))

        // Departments
        .route("/departments", post(handlers::create_department))
        .route(
            "/departments/{department_id}",
            patch(handlers::update_department).delete(handlers::delete_department),
        )

        // Doctors
        .route("/doctors", post(handlers::create_doctor).get(handlers::search_doctors))
        .route(
            "/doctors/{doctor_id}",
            get(handlers::get_doctor)
                .patch(handlers::update_doctor)
                .delete(handlers::delete_doctor),
        )

        // Accounts
        .route("/staff", post(handlers::create_staff))
        .route("/users", get(handlers::list_users))
        .route("/users/{user_id}/role", patch(handlers::update_user_role))
        .route("/users/{user_id}", delete(handlers::deactivate_user))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
