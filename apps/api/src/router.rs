use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::{
    create_admin_appointment_router, create_appointment_router, create_staff_appointment_router,
    AppointmentState,
};
use booking_queue_cell::{create_booking_queue_router, BroadcastPublisher, NotificationDispatcher, QueueState};
use directory_cell::{create_directory_router, DirectoryState};
use shared_config::AppConfig;
use shared_database::ClinicStore;

pub fn create_router(
    config: Arc<AppConfig>,
    store: Arc<dyn ClinicStore>,
    events: Arc<BroadcastPublisher>,
    notifier: NotificationDispatcher,
) -> Router {
    let appointments = AppointmentState::new(config.clone(), store.clone(), events.clone(), notifier);
    let queue = QueueState::new(config.clone(), store.clone(), events);
    let directory = DirectoryState::new(config, store);

    Router::new()
        .route("/", get(|| async { "Clinic queue API is running!" }))
        .route("/health", get(health))
        .nest("/appointments", create_appointment_router(appointments.clone()))
        .nest(
            "/staff",
            create_booking_queue_router(queue).merge(create_staff_appointment_router(appointments.clone())),
        )
        .nest(
            "/admin",
            create_directory_router(directory).merge(create_admin_appointment_router(appointments)),
        )
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
