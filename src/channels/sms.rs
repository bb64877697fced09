use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;

use super::{SendError, SmsSender};

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub timeout: Duration,
}

/// Twilio-style SMS sender: form-encoded POST against the messages resource,
/// basic auth with account sid and token.
pub struct TwilioSmsSender {
    config: SmsConfig,
    http_client: Client,
    base_url: String,
}

impl TwilioSmsSender {
    pub fn new(config: SmsConfig) -> Self {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self {
            config,
            http_client,
            base_url: "https://api.twilio.com/2010-04-01".to_string(),
        }
    }

}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, SendError> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        );

        let mut params: HashMap<&str, String> = HashMap::new();
        params.insert("To", to.to_string());
        params.insert("From", self.config.from_number.clone());
        params.insert("Body", body.to_string());

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| SendError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<ProviderErrorResponse>()
                .await
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("status {status}"));
            error!("SMS provider rejected message to {to}: {detail}");
            return Err(SendError::Provider(detail));
        }

        let message: ProviderMessageResponse = response
            .json()
            .await
            .map_err(|e| SendError::Provider(format!("malformed response: {e}")))?;

        info!("SMS {} queued for {to}", message.sid);
        Ok(message.sid)
    }
}

#[derive(Debug, Deserialize)]
struct ProviderMessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorResponse {
    message: String,
}
