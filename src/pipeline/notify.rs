//! Notification: summarise the scan, attach the PDF, send one e-mail.
//!
//! The message is assembled as a plain [`NotificationMessage`] first and only
//! converted to a `lettre` [`Message`] at the end, so the content can be
//! inspected (dry run, `--json`, tests) without any mail machinery.
//!
//! Sending is generic over [`AsyncTransport`]: production uses an
//! authenticated SMTP relay, tests use lettre's stub transport. A failed
//! send is reported once and never retried.

use crate::config::MailConfig;
use crate::error::GazetteError;
use crate::pipeline::scan::{ScanResult, SearchTerm};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// SMTP command timeout.
const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// A file attached to the notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationAttachment {
    pub name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Transport-independent e-mail content.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub subject: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub body: String,
    pub attachment: Option<NotificationAttachment>,
}

impl NotificationMessage {
    /// Convert into a MIME message: a plain-text part followed by the
    /// attachment, addressed to every recipient at once.
    pub fn to_message(&self) -> Result<Message, GazetteError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.sender)?)
            .subject(self.subject.as_str());
        for recipient in &self.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(self.body.clone()));
        if let Some(ref attachment) = self.attachment {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                GazetteError::Internal(format!(
                    "content type '{}': {}",
                    attachment.content_type, e
                ))
            })?;
            parts = parts.singlepart(
                Attachment::new(attachment.name.clone()).body(attachment.bytes.clone(), content_type),
            );
        }

        builder
            .multipart(parts)
            .map_err(|e| GazetteError::Internal(format!("building message: {}", e)))
    }
}

/// Parse one address, mapping failures to a configuration error.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, GazetteError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| GazetteError::InvalidConfig(format!("e-mail address '{}': {}", address, e)))
}

/// Plain-text body for a scan result.
///
/// One paragraph per occurrence, or a single "not found" sentence.
pub fn compose_body(term: &SearchTerm, result: &ScanResult) -> String {
    if result.is_empty() {
        return format!("The term '{}' was not found in the gazette PDF.", term);
    }

    let mut body = format!("The term '{}' was found on the following pages:\n\n", term);
    for occurrence in result {
        body.push_str(&format!(
            "- Page {}: ...{}...\n\n",
            occurrence.page, occurrence.snippet
        ));
    }
    body
}

/// Assemble the notification for `result`, attaching `pdf` when given.
pub fn build_notification(
    mail: &MailConfig,
    term: &SearchTerm,
    result: &ScanResult,
    pdf: Option<&[u8]>,
) -> NotificationMessage {
    NotificationMessage {
        subject: mail.subject.clone(),
        sender: mail.sender.trim().to_string(),
        recipients: mail.recipient_list(),
        body: compose_body(term, result),
        attachment: pdf.map(|bytes| NotificationAttachment {
            name: mail.attachment_name.clone(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            bytes: bytes.to_vec(),
        }),
    }
}

/// Authenticated SMTP transport: implicit TLS on port 465, STARTTLS otherwise.
pub fn smtp_transport(mail: &MailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, GazetteError> {
    let builder = if mail.smtp_port == 465 {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&mail.smtp_host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.smtp_host)
    }
    .map_err(|e| GazetteError::SendFailed {
        reason: format!("SMTP relay '{}': {}", mail.smtp_host, e),
    })?;

    Ok(builder
        .port(mail.smtp_port)
        .credentials(Credentials::new(
            mail.sender.trim().to_string(),
            mail.password.clone(),
        ))
        .timeout(Some(SMTP_TIMEOUT))
        .build())
}

/// Send `notification` through `transport`.
pub async fn send<T>(transport: &T, notification: &NotificationMessage) -> Result<(), GazetteError>
where
    T: AsyncTransport + Sync,
    T::Error: std::fmt::Display,
{
    let message = notification.to_message()?;
    debug!(
        "Sending '{}' to {} recipient(s)",
        notification.subject,
        notification.recipients.len()
    );

    transport
        .send(message)
        .await
        .map_err(|e| GazetteError::SendFailed {
            reason: e.to_string(),
        })?;

    info!(
        "E-mail sent to: {}",
        notification.recipients.join(", ")
    );
    Ok(())
}
