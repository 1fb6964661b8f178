use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    call_next, get_dashboard, get_queue, list_staff_appointments, pause_queue, resume_queue,
    stream_events,
};
use crate::services::{events::BroadcastPublisher, queue::QueueService};

#[derive(Clone)]
pub struct QueueState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
    pub queue: Arc<QueueService>,
    pub events: Arc<BroadcastPublisher>,
}

impl QueueState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn ClinicStore>, events: Arc<BroadcastPublisher>) -> Self {
        let queue = Arc::new(QueueService::new(store.clone(), events.clone()));
        Self { config, store, queue, events }
    }
}

/// Staff queue routes, mounted under `/staff`.
pub fn create_booking_queue_router(state: QueueState) -> Router {
    Router::new()
        .route("/queue", get(get_queue))
        .route("/queue/call-next", post(call_next))
        .route("/queue/pause", post(pause_queue))
        .route("/queue/resume", post(resume_queue))
        .route("/appointments", get(list_staff_appointments))
        .route("/dashboard", get(get_dashboard))
        .route("/events", get(stream_events))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
