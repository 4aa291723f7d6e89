//! Notification dispatch and external identity resolution
//!
//! Notifications are a side effect of state transitions, never part of them:
//! dispatch is spawned after the transaction commits, and a delivery failure
//! is logged and dropped. Nothing here can roll a transition back.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// A state transition worth telling the borrower about
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    BorrowApproved {
        reservation_id: Uuid,
        recipient: Option<String>,
        equipment_name: String,
    },
    BorrowRejected {
        reservation_id: Uuid,
        recipient: Option<String>,
        equipment_name: String,
    },
    EquipmentReleased {
        reservation_id: Uuid,
        recipient: Option<String>,
        equipment_name: String,
    },
    ReturnDecided {
        reservation_id: Uuid,
        recipient: Option<String>,
        accepted: bool,
        total_fee: Decimal,
    },
}

impl NotificationEvent {
    fn recipient(&self) -> Option<&str> {
        match self {
            NotificationEvent::BorrowApproved { recipient, .. }
            | NotificationEvent::BorrowRejected { recipient, .. }
            | NotificationEvent::EquipmentReleased { recipient, .. }
            | NotificationEvent::ReturnDecided { recipient, .. } => recipient.as_deref(),
        }
    }

    fn subject_and_body(&self) -> (String, String) {
        match self {
            NotificationEvent::BorrowApproved {
                reservation_id,
                equipment_name,
                ..
            } => (
                "Your borrow request was approved".to_string(),
                format!(
                    "Your request {} for \"{}\" has been approved.\nPlease pick the equipment up at the lab desk.",
                    reservation_id, equipment_name
                ),
            ),
            NotificationEvent::BorrowRejected {
                reservation_id,
                equipment_name,
                ..
            } => (
                "Your borrow request was rejected".to_string(),
                format!(
                    "Your request {} for \"{}\" has been rejected.",
                    reservation_id, equipment_name
                ),
            ),
            NotificationEvent::EquipmentReleased {
                reservation_id,
                equipment_name,
                ..
            } => (
                "Equipment handed over".to_string(),
                format!(
                    "The equipment for request {} (\"{}\") has been handed over to you.\nPlease return it by the end of your reserved window.",
                    reservation_id, equipment_name
                ),
            ),
            NotificationEvent::ReturnDecided {
                reservation_id,
                accepted,
                total_fee,
                ..
            } => {
                if *accepted {
                    (
                        "Return accepted".to_string(),
                        format!(
                            "Your return for request {} was accepted. Total fee: {}.",
                            reservation_id, total_fee
                        ),
                    )
                } else {
                    (
                        "Return rejected".to_string(),
                        format!(
                            "Your return for request {} was rejected. The loan remains open; please contact the lab desk.",
                            reservation_id
                        ),
                    )
                }
            }
        }
    }
}

/// Notification dispatcher boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> AppResult<()>;
}

/// Resolves an external identity reference (e.g. a maintenance assignee) to
/// a canonical identifier. Identity resolution belongs to the identity
/// provider; the core only calls through this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> AppResult<Option<String>>;
}

/// Resolver that accepts references verbatim, for deployments where the
/// shell already passes canonical identifiers.
pub struct PassthroughResolver;

#[async_trait]
impl IdentityResolver for PassthroughResolver {
    async fn resolve(&self, reference: &str) -> AppResult<Option<String>> {
        Ok(Some(reference.to_string()))
    }
}

/// Fire-and-forget dispatch: spawned off the request path, failures logged.
/// Returns the join handle so tests can await completion.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    event: NotificationEvent,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&event).await {
            tracing::warn!("Notification dispatch failed: {}", e);
        }
    })
}

/// SMTP-backed notifier
#[derive(Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Labstock");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        mailer_builder
            .build()
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, event: &NotificationEvent) -> AppResult<()> {
        let Some(to) = event.recipient() else {
            tracing::debug!("No recipient for event {:?}, skipping", event);
            return Ok(());
        };
        let (subject, body) = event.subject_and_body();
        self.send_email(to, &subject, &body)
    }
}
