use std::time::Duration;

use anyhow::Context;

use crate::channels::email::SmtpConfig;
use crate::channels::sms::SmsConfig;
use crate::channels::translate::TranslateConfig;

/// All runtime configuration, read once at startup and handed to the
/// dispatcher and channel senders at construction time. Nothing reads the
/// environment after boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    /// Staff API key; staff routes answer 500 until one is configured.
    pub api_key: Option<String>,
    /// Shared secret expected on the inbound SMS webhook.
    pub webhook_secret: Option<String>,
    pub sms: Option<SmsConfig>,
    pub smtp: Option<SmtpConfig>,
    pub translate: Option<TranslateConfig>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env_opt("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_opt("PORT")
            .map(|p| p.parse::<u16>().context("PORT is not a valid port number"))
            .transpose()?
            .unwrap_or(8080);
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let timeout = env_opt("PROVIDER_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let sms = match (
            env_opt("TWILIO_ACCOUNT_SID"),
            env_opt("TWILIO_AUTH_TOKEN"),
            env_opt("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(SmsConfig {
                account_sid,
                auth_token,
                from_number,
                timeout,
            }),
            _ => None,
        };

        let smtp = match (env_opt("SMTP_HOST"), env_opt("SMTP_FROM")) {
            (Some(host), Some(from)) => Some(SmtpConfig {
                host,
                username: env_opt("SMTP_USER"),
                password: env_opt("SMTP_PASS"),
                from,
            }),
            _ => None,
        };

        let translate = env_opt("TRANSLATE_URL").map(|endpoint| TranslateConfig {
            endpoint,
            api_key: env_opt("TRANSLATE_API_KEY"),
            timeout,
        });

        Ok(Self {
            server: ServerConfig { host, port },
            database_url,
            api_key: env_opt("API_KEY"),
            webhook_secret: env_opt("SMS_WEBHOOK_SECRET"),
            sms,
            smtp,
            translate,
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
