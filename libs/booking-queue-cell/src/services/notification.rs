use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_models::appointment::Appointment;

/// Delivers a booking confirmation to a patient.
#[async_trait]
pub trait ConfirmationSender: Send + Sync {
    async fn send_booking_confirmation(&self, email: &str, appointment: &Appointment) -> Result<()>;
}

/// Writes the confirmation to the log instead of delivering it.
pub struct LogConfirmationSender;

#[async_trait]
impl ConfirmationSender for LogConfirmationSender {
    async fn send_booking_confirmation(&self, email: &str, appointment: &Appointment) -> Result<()> {
        info!(
            "Booking confirmation for {}: token {} on {} at {}",
            email, appointment.token_number, appointment.date, appointment.time_slot
        );
        Ok(())
    }
}

/// Posts the confirmation as JSON to an external delivery service.
pub struct WebhookConfirmationSender {
    client: Client,
    url: String,
}

impl WebhookConfirmationSender {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ConfirmationSender for WebhookConfirmationSender {
    async fn send_booking_confirmation(&self, email: &str, appointment: &Appointment) -> Result<()> {
        debug!("Posting booking confirmation to {}", self.url);

        let body = json!({
            "type": "booking_confirmation",
            "to": email,
            "appointment": {
                "id": appointment.id,
                "date": appointment.date,
                "timeSlot": appointment.time_slot,
                "tokenNumber": appointment.token_number,
                "departmentId": appointment.department_id,
                "doctorId": appointment.doctor_id,
                "isEmergency": appointment.is_emergency,
            }
        });

        let response = self.client.post(&self.url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Notification service error ({}): {}", status, error_text));
        }

        Ok(())
    }
}

/// Runs confirmation delivery off the request path. Failures are logged
/// and never reach the booking that triggered them.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: Arc<dyn ConfirmationSender>,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn ConfirmationSender>) -> Self {
        Self { sender }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match &config.notification_webhook_url {
            Some(url) => {
                info!("Booking confirmations will be posted to {}", url);
                Self::new(Arc::new(WebhookConfirmationSender::new(url.clone())))
            }
            _ => {
                info!("No notification webhook configured, confirmations are logged only");
                Self::new(Arc::new(LogConfirmationSender))
            }
        }
    }

    pub fn dispatch_booking_confirmation(&self, email: String, appointment: Appointment) -> JoinHandle<()> {
        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            if let Err(e) = sender.send_booking_confirmation(&email, &appointment).await {
                warn!(
                    "Failed to send booking confirmation for appointment {}: {}",
                    appointment.id, e
                );
            }
        })
    }
}
