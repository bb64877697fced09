pub mod email;
pub mod sms;
pub mod translate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Delivery medium for an outbound notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider rejected the message: {0}")]
    Provider(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Sends one text message and returns the provider's message id.
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, SendError>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendError>;
}
