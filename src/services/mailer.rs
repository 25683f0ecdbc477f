use std::time::Duration;

use derive_more::Display;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{debug, info};

use crate::model::smtp_account::SmtpAccount;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Display)]
pub enum MailError {
    #[display(fmt = "Invalid address {}", _0)]
    Address(String),
    #[display(fmt = "Failed to build message: {}", _0)]
    Build(String),
    #[display(fmt = "{}", _0)]
    Transport(String),
}

/// Connection settings for one SMTP server.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub user: String,
    pub pass: String,
}

impl From<&SmtpAccount> for SmtpSettings {
    fn from(account: &SmtpAccount) -> Self {
        Self {
            host: account.host.clone(),
            port: account.port,
            secure: account.secure,
            user: account.auth.user.clone(),
            pass: account.auth.pass.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingAttachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<OutgoingAttachment>,
}

fn transport(settings: &SmtpSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let builder = if settings.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
    }
    .map_err(|e| MailError::Transport(e.to_string()))?;

    Ok(builder
        .port(settings.port)
        .credentials(Credentials::new(
            settings.user.clone(),
            settings.pass.clone(),
        ))
        .timeout(Some(SMTP_TIMEOUT))
        .build())
}

fn mailbox(raw: &str) -> Result<Mailbox, MailError> {
    raw.trim()
        .parse()
        .map_err(|_| MailError::Address(raw.to_string()))
}

fn content_type(raw: &str) -> Result<ContentType, MailError> {
    ContentType::parse(raw)
        .or_else(|_| ContentType::parse("application/octet-stream"))
        .map_err(|e| MailError::Build(e.to_string()))
}

pub fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    let mut body = MultiPart::mixed().singlepart(SinglePart::html(mail.html.clone()));

    for attachment in &mail.attachments {
        body = body.singlepart(
            Attachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type(&attachment.content_type)?),
        );
    }

    Message::builder()
        .from(mailbox(&mail.from)?)
        .to(mailbox(&mail.to)?)
        .subject(mail.subject.clone())
        .multipart(body)
        .map_err(|e| MailError::Build(e.to_string()))
}

/// Opens a connection and authenticates, without sending anything.
pub async fn test_connection(settings: &SmtpSettings) -> Result<(), MailError> {
    debug!(host = %settings.host, port = settings.port, "Testing SMTP connection");

    let connected = transport(settings)?
        .test_connection()
        .await
        .map_err(|e| MailError::Transport(e.to_string()))?;

    if connected {
        Ok(())
    } else {
        Err(MailError::Transport(format!(
            "{}:{} did not accept the connection",
            settings.host, settings.port
        )))
    }
}

pub async fn send(settings: &SmtpSettings, mail: &OutgoingMail) -> Result<(), MailError> {
    let message = build_message(mail)?;

    transport(settings)?
        .send(message)
        .await
        .map_err(|e| MailError::Transport(e.to_string()))?;

    info!(
        to = %mail.to,
        attachments = mail.attachments.len(),
        "Email delivered"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            from: "noreply@centrapro.com".into(),
            to: to.into(),
            subject: "Invoice from CentraPro".into(),
            html: "<p>hi</p>".into(),
            attachments: vec![OutgoingAttachment {
                filename: "week1.pdf".into(),
                content: b"%PDF-1.4".to_vec(),
                content_type: "not a mime type".into(),
            }],
        }
    }

    #[test]
    fn builds_multipart_with_fallback_content_type() {
        let message = build_message(&mail("vendor@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("application/octet-stream"));
        assert!(raw.contains("week1.pdf"));
    }

    #[test]
    fn rejects_bad_recipient() {
        assert!(matches!(
            build_message(&mail("not-an-address")),
            Err(MailError::Address(_))
        ));
    }
}
