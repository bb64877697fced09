use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::info;

use super::{EmailSender, SendError};

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct SmtpEmailSender {
    config: SmtpConfig,
}

impl SmtpEmailSender {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError> {
        let email = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| SendError::InvalidMessage(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| SendError::InvalidMessage(format!("invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SendError::InvalidMessage(format!("failed to build email: {e}")))?;

        let mailer = match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => {
                let creds = Credentials::new(user.clone(), pass.clone());
                SmtpTransport::relay(&self.config.host)
                    .map_err(|e| SendError::Network(format!("SMTP relay error: {e}")))?
                    .credentials(creds)
                    .build()
            }
            _ => SmtpTransport::builder_dangerous(&self.config.host).build(),
        };

        mailer
            .send(&email)
            .map_err(|e| SendError::Provider(e.to_string()))?;

        info!("email sent to {to}");
        Ok(())
    }
}
