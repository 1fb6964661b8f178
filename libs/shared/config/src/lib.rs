use std::env;
use tracing::warn;

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub notification_webhook_url: Option<String>,
    pub event_channel_capacity: usize,
    pub server_port: u16,
    pub frontend_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            event_channel_capacity: env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|raw| match raw.parse::<usize>() {
                    Ok(capacity) if capacity > 0 => Some(capacity),
                    _ => {
                        warn!("EVENT_CHANNEL_CAPACITY is not a positive integer, using default");
                        None
                    }
                })
                .unwrap_or(DEFAULT_EVENT_CHANNEL_CAPACITY),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|raw| raw.parse::<u16>().ok())
                .unwrap_or_else(|| {
                    warn!("SERVER_PORT not set or invalid, using default");
                    DEFAULT_SERVER_PORT
                }),
            frontend_url: env::var("FRONTEND_URL").ok(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if !config.is_webhook_configured() {
            warn!("NOTIFICATION_WEBHOOK_URL not set, booking confirmations will only be logged");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_webhook_configured(&self) -> bool {
        self.notification_webhook_url.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            notification_webhook_url: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            server_port: DEFAULT_SERVER_PORT,
            frontend_url: None,
        }
    }
}
