//! Outgoing mail.
//!
//! Handlers talk to the `Mailer` port. `main` picks the SMTP adapter when
//! `MAIL_HOST` is configured and the logging adapter otherwise.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{config::MailConfig, error::AppError};

/// A rendered email, ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), AppError>;
}

/// Sends mail through an SMTP relay. The transport is built once and reused.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, AppError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| AppError::InternalServerError("MAIL_HOST not configured".to_string()))?;

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| AppError::InternalServerError(format!("Invalid MAIL_FROM: {}", e)))?;

        let builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?
            .port(config.port);

        let builder = if let (Some(user), Some(pass)) = (&config.user, &config.pass) {
            builder.credentials(Credentials::new(user.clone(), pass.clone()))
        } else {
            builder
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<(), AppError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html),
                    ),
            )
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Used when no SMTP relay is configured: the message is only logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), AppError> {
        tracing::warn!(
            to = %message.to,
            subject = %message.subject,
            "Email not configured, message not delivered:\n{}",
            message.text
        );
        Ok(())
    }
}

/// Renders the password reset email.
pub fn password_reset_email(to: &str, name: &str, reset_url: &str) -> MailMessage {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: sans-serif;">
    <p>Hello {name},</p>
    <p>You have requested a password reset. Please click the following button to continue on with resetting your password.</p>
    <p><a href="{url}" style="display:inline-block;padding:10px 20px;background:#303030;color:#fff;text-decoration:none;">Reset my password</a></p>
    <p>If you can't click the above button please visit <a href="{url}">{url}</a></p>
    <p>This link expires in one hour. If you didn't request this email, please ignore it.</p>
</body>
</html>"#,
        name = ammonia::clean_text(name),
        url = reset_url,
    );

    let text = format!(
        "Hello {name},\n\n\
         You have requested a password reset. Visit the link below to choose a new password:\n\n\
         {url}\n\n\
         This link expires in one hour. If you didn't request this email, please ignore it.\n",
        name = name,
        url = reset_url,
    );

    MailMessage {
        to: to.to_string(),
        subject: "Password reset".to_string(),
        html,
        text,
    }
}
