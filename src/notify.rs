//! Notification dispatch after a successful save.
//!
//! The production deployment forwards the composed message to a mail relay
//! webhook; without one configured the message is only logged. Either way,
//! delivery failure comes back as a warning string on the save result, never
//! as a fatal error.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Requisition, RequisitionStatus};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("relay error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;

    /// The fixed distribution address messages are composed for.
    fn recipient(&self) -> &str;
}

/// Forwards messages to a mail relay webhook as JSON.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
    to: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String, to: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
            to,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.client
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn recipient(&self) -> &str {
        &self.to
    }
}

/// Stand-in when no relay is configured: logs the subject and succeeds.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        log::info!("notification (no relay configured): {}", message.subject);
        Ok(())
    }

    fn recipient(&self) -> &str {
        "supervisaomontagemipatinga@gmail.com"
    }
}

/// Builds the summary message for a saved requisition. Cancellation is called
/// out in capitals, as the old system did, so it stands apart in the inbox.
pub fn compose_summary(
    record: &Requisition,
    submitted_by: &str,
    is_new: bool,
    to: &str,
) -> EmailMessage {
    let action = if record.status == RequisitionStatus::Canceled {
        "CANCELED"
    } else if is_new {
        "Created"
    } else {
        "Updated"
    };

    let subject = format!(
        "Requisition {}: {} - {}",
        action, record.requisition_number, record.client_name
    );

    let status_color = match record.status {
        RequisitionStatus::Done => "green",
        RequisitionStatus::InProgress => "#d97706",
        RequisitionStatus::Canceled => "#E30613",
        RequisitionStatus::Received => "#333",
    };

    let html = format!(
        concat!(
            "<div style='font-family: Arial, sans-serif; color: #333; max-width: 600px;'>",
            "<h2 style='margin-top:0;'>Requisition System</h2>",
            "<p>A requisition was <strong>{action}</strong>.</p>",
            "<table style='width: 100%; border-collapse: collapse;'>",
            "<tr><td style='padding: 8px; font-weight: bold;'>Number:</td><td style='padding: 8px;'>{number}</td></tr>",
            "<tr><td style='padding: 8px; font-weight: bold;'>Status:</td><td style='padding: 8px; color: {color}; font-weight: bold;'>{status}</td></tr>",
            "<tr><td style='padding: 8px; font-weight: bold;'>Client:</td><td style='padding: 8px;'>{client}</td></tr>",
            "<tr><td style='padding: 8px; font-weight: bold;'>Environment:</td><td style='padding: 8px;'>{environment}</td></tr>",
            "<tr><td style='padding: 8px; font-weight: bold;'>Fitter:</td><td style='padding: 8px;'>{fitter}</td></tr>",
            "<tr><td style='padding: 8px; font-weight: bold;'>User:</td><td style='padding: 8px;'>{user}</td></tr>",
            "<tr><td style='padding: 8px; font-weight: bold;'>Services:</td><td style='padding: 8px;'>{services} item(s)</td></tr>",
            "<tr><td style='padding: 8px; font-weight: bold;'>Deliveries:</td><td style='padding: 8px;'>{deliveries} item(s)</td></tr>",
            "</table>",
            "<p style='font-size: 12px; color: #999;'>Automated message, do not reply.</p>",
            "</div>",
        ),
        action = action.to_lowercase(),
        number = record.requisition_number,
        color = status_color,
        status = record.status.label(),
        client = record.client_name,
        environment = record.environment,
        fitter = record.fitter,
        user = submitted_by,
        services = record.services.len(),
        deliveries = record.delivery_items.len(),
    );

    EmailMessage {
        to: to.to_string(),
        subject,
        html,
    }
}
