use super::{MailBackend, MailError, OutgoingMail};
use crate::settings::EventSettings;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    None,
    /// Upgrade the plain connection with STARTTLS
    StartTls,
    /// Implicit TLS from the start of the connection (often called SSL)
    Tls,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Username and password
    pub credentials: Option<(String, String)>,
    pub security: SmtpSecurity,
}

impl SmtpConfig {
    /// SMTP configuration from the custom SMTP settings of an event. Implicit TLS (`smtp_use_ssl`)
    /// takes precedence over STARTTLS (`smtp_use_tls`).
    pub fn from_settings(settings: &EventSettings) -> Self {
        Self {
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
            credentials: if settings.smtp_username.is_empty() {
                None
            } else {
                Some((
                    settings.smtp_username.clone(),
                    settings.smtp_password.clone(),
                ))
            },
            security: if settings.smtp_use_ssl {
                SmtpSecurity::Tls
            } else if settings.smtp_use_tls {
                SmtpSecurity::StartTls
            } else {
                SmtpSecurity::None
            },
        }
    }
}

pub struct SmtpBackend {
    transport: SmtpTransport,
}

impl SmtpBackend {
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        if config.host.is_empty() {
            return Err(MailError::TransportError(
                "No SMTP host configured".to_owned(),
            ));
        }
        let mut builder = match config.security {
            SmtpSecurity::None => SmtpTransport::builder_dangerous(&config.host),
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&config.host)?,
            SmtpSecurity::Tls => SmtpTransport::relay(&config.host)?,
        }
        .port(config.port);
        if let Some((username, password)) = config.credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(mail.from.parse::<Mailbox>()?)
        .to(mail.to.parse::<Mailbox>()?)
        .subject(mail.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(reply_to.parse::<Mailbox>()?);
    }
    Ok(builder.body(mail.text.clone())?)
}

impl MailBackend for SmtpBackend {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = build_message(mail)?;
        self.transport.send(&message)?;
        Ok(())
    }
}

/// Writes mails to the log instead of sending them
pub struct LogBackend;

impl MailBackend for LogBackend {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        // Build the message anyway, to detect invalid addresses like the SMTP backend does
        build_message(mail)?;
        info!(
            "Mail from {} to {} (reply to {}): {}\n\n{}",
            mail.from,
            mail.to,
            mail.reply_to.as_deref().unwrap_or("-"),
            mail.subject,
            mail.text
        );
        Ok(())
    }
}
