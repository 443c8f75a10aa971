//! Outbound mail
//!
//! Mails are not sent directly by the submission workflow. Instead, they are stored in the
//! `queued_mails` table within the same database transaction as the state change, and delivered
//! afterwards by [deliver_pending_mails]. Mails that could not be delivered stay in the queue.
//!
//! The [MailBackend] for an event is chosen by a [MailBackendProvider]: In production, this is the
//! [DefaultMailTransport] from the environment configuration, which is replaced by the event's
//! custom SMTP server, if configured in the event settings (see [get_mail_backend]).

use crate::data_store::auth_token::AuthToken;
use crate::data_store::models::QueuedMail;
use crate::data_store::{CallboardStoreFacade, EventId, StoreError};
use crate::settings::EventSettings;
use crate::setup::DefaultMailTransport;
use log::{error, info};
use std::fmt::{Display, Formatter};

mod smtp;
pub mod templates;

pub use smtp::{LogBackend, SmtpBackend, SmtpConfig, SmtpSecurity};

/// A single mail, ready to be handed to a [MailBackend]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
}

impl OutgoingMail {
    pub fn from_queued(mail: &QueuedMail, from: &str) -> Self {
        Self {
            from: from.to_owned(),
            to: mail.to_address.clone(),
            reply_to: mail.reply_to.clone(),
            subject: mail.subject.clone(),
            text: mail.text.clone(),
        }
    }
}

pub trait MailBackend {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Factory for the [MailBackend] of an event, based on the event's settings
pub trait MailBackendProvider: Send + Sync {
    fn backend_for(
        &self,
        settings: &EventSettings,
        force_custom: bool,
    ) -> Result<Box<dyn MailBackend + Send>, MailError>;
}

impl MailBackendProvider for DefaultMailTransport {
    fn backend_for(
        &self,
        settings: &EventSettings,
        force_custom: bool,
    ) -> Result<Box<dyn MailBackend + Send>, MailError> {
        get_mail_backend(settings, self, force_custom)
    }
}

/// Get the mail backend for an event: A custom SMTP connection according to the event's settings,
/// if `smtp_use_custom` is set or `force_custom` is requested, otherwise the default transport.
pub fn get_mail_backend(
    settings: &EventSettings,
    default_transport: &DefaultMailTransport,
    force_custom: bool,
) -> Result<Box<dyn MailBackend + Send>, MailError> {
    if settings.smtp_use_custom || force_custom {
        return Ok(Box::new(SmtpBackend::new(SmtpConfig::from_settings(
            settings,
        ))?));
    }
    match default_transport {
        DefaultMailTransport::Smtp { host, port } => Ok(Box::new(SmtpBackend::new(SmtpConfig {
            host: host.clone(),
            port: *port,
            credentials: None,
            security: SmtpSecurity::None,
        })?)),
        DefaultMailTransport::Log => Ok(Box::new(LogBackend)),
    }
}

/// Result of [deliver_pending_mails]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send all queued mails of the event via the given backend.
///
/// The mails are claimed in the data store before sending, so a mail is delivered only once, even
/// if several requests deliver the event's mails at the same time. Failing deliveries are logged
/// and the mail is put back into the queue for a later retry. Only a failure to claim the mails
/// aborts the delivery.
pub fn deliver_pending_mails(
    store: &mut dyn CallboardStoreFacade,
    auth_token: &AuthToken,
    event_id: EventId,
    backend: &dyn MailBackend,
    mail_from: &str,
) -> Result<DeliveryReport, StoreError> {
    let mut report = DeliveryReport::default();
    for queued_mail in store.claim_pending_mails(auth_token, event_id)? {
        match backend.send(&OutgoingMail::from_queued(&queued_mail, mail_from)) {
            Ok(()) => {
                info!(
                    "Sent mail {} '{}' to {}",
                    queued_mail.id, queued_mail.subject, queued_mail.to_address
                );
                report.sent += 1;
            }
            Err(e) => {
                error!(
                    "Could not send mail {} to {}: {}",
                    queued_mail.id, queued_mail.to_address, e
                );
                match store.release_mail(auth_token, event_id, queued_mail.id) {
                    Ok(()) => {}
                    // Already back in the queue
                    Err(StoreError::NotExisting) => {}
                    Err(e) => error!("Could not re-queue mail {}: {}", queued_mail.id, e),
                }
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

#[derive(Debug)]
pub enum MailError {
    /// A sender, recipient or reply-to address could not be parsed
    InvalidAddress(String),
    /// The mail message could not be assembled
    MessageBuildError(String),
    /// The SMTP transport could not be set up or failed sending
    TransportError(String),
}

impl Display for MailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MailError::InvalidAddress(e) => write!(f, "Invalid mail address: {}", e),
            MailError::MessageBuildError(e) => write!(f, "Could not build mail message: {}", e),
            MailError::TransportError(e) => write!(f, "Mail transport failed: {}", e),
        }
    }
}

impl std::error::Error for MailError {}

impl From<lettre::address::AddressError> for MailError {
    fn from(value: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(value.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(value: lettre::error::Error) -> Self {
        Self::MessageBuildError(value.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(value: lettre::transport::smtp::Error) -> Self {
        Self::TransportError(value.to_string())
    }
}
