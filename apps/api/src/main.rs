use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use booking_queue_cell::{BroadcastPublisher, NotificationDispatcher};
use shared_config::AppConfig;
use shared_database::{ClinicStore, InMemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic queue API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn ClinicStore> = Arc::new(InMemoryStore::new());
    let events = Arc::new(BroadcastPublisher::new(config.event_channel_capacity));
    let notifier = NotificationDispatcher::from_config(&config);

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin(&config))
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(config.clone(), store, events, notifier)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn allowed_origin(config: &AppConfig) -> AllowOrigin {
    match config.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            warn!("FRONTEND_URL is not a valid origin, allowing any origin");
            AllowOrigin::any()
        }
        None => AllowOrigin::any(),
    }
}
