use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use booking_queue_cell::{EventPublisher, NotificationDispatcher};
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{
    AdmissionService, CalendarService, HistoryService, LifecycleService, TokenSequencer,
};

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
    pub calendar: Arc<CalendarService>,
    pub admission: Arc<AdmissionService>,
    pub lifecycle: Arc<LifecycleService>,
    pub history: Arc<HistoryService>,
}

impl AppointmentState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn ClinicStore>,
        events: Arc<dyn EventPublisher>,
        notifier: NotificationDispatcher,
    ) -> Self {
        let sequencer = Arc::new(TokenSequencer::new(store.clone()));
        Self {
            calendar: Arc::new(CalendarService::new(store.clone())),
            admission: Arc::new(AdmissionService::new(
                store.clone(),
                sequencer,
                events.clone(),
                notifier,
            )),
            lifecycle: Arc::new(LifecycleService::new(store.clone(), events)),
            history: Arc::new(HistoryService::new(store.clone())),
            config,
            store,
        }
    }
}

/// Patient-facing routes, mounted under `/appointments`.
pub fn create_appointment_router(state: AppointmentState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/organizations", get(handlers::list_organizations))
        .route("/organizations/{organization_id}/departments", get(handlers::list_departments))
        .route("/departments/{department_id}/doctors", get(handlers::list_department_doctors))
        .route("/departments/{department_id}/slots", get(handlers::get_available_slots))
        .route("/departments/{department_id}/dates", get(handlers::get_available_dates));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/mine", get(handlers::my_appointments))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Staff status transitions, merged into `/staff`.
pub fn create_staff_appointment_router(state: AppointmentState) -> Router {
    Router::new()
        .route("/appointments/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/appointments/{appointment_id}/no-show", patch(handlers::mark_no_show))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

/// Admin booking and reporting routes, merged into `/admin`.
pub fn create_admin_appointment_router(state: AppointmentState) -> Router {
    Router::new()
        .route("/appointments", get(handlers::list_all_appointments))
        .route("/appointments/emergency", post(handlers::book_emergency))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
