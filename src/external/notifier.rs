use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MailAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl Email {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound email. Delivery is best effort: implementations report the
/// outcome and never fail the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, email: &Email) -> bool;
}

pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifierError> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::Address(e.to_string()))?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifierError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, from })
    }

    fn build_message(&self, email: &Email) -> Result<Message, NotifierError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotifierError::Address(e.to_string()))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject);

        let message = match &email.attachment {
            Some(att) => {
                let content_type = ContentType::parse(&att.content_type)
                    .map_err(|e| NotifierError::Transport(e.to_string()))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(email.body.clone()))
                        .singlepart(MailAttachment::new(att.filename.clone()).body(att.bytes.clone(), content_type)),
                )
            }
            None => builder.singlepart(SinglePart::plain(email.body.clone())),
        };
        message.map_err(|e| NotifierError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, email: &Email) -> bool {
        let message = match self.build_message(email) {
            Ok(m) => m,
            Err(e) => {
                warn!("Failed to build email to {}: {}", email.to, e);
                return false;
            }
        };
        match self.mailer.send(message).await {
            Ok(_) => {
                info!("Email sent to {}: {}", email.to, email.subject);
                true
            }
            Err(e) => {
                warn!("SMTP delivery to {} failed: {}", email.to, e);
                false
            }
        }
    }
}

/// Writes messages to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, email: &Email) -> bool {
        info!(
            to = %email.to,
            subject = %email.subject,
            attachment = email.attachment.as_ref().map(|a| a.filename.as_str()).unwrap_or("-"),
            "Email (SMTP disabled)"
        );
        true
    }
}
