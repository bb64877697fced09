use std::time::Duration;

use log::warn;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::templates::DEFAULT_LANGUAGE;

#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Best-effort text translation.
///
/// Translation never blocks a notification: when no backend is configured,
/// when the target language is the default, or when the backend errors in
/// any way, the input text is returned unchanged. Callers never branch on
/// translation failure.
pub struct Translator {
    config: Option<TranslateConfig>,
    http_client: Client,
}

impl Translator {
    pub fn new(config: Option<TranslateConfig>) -> Self {
        let timeout = config
            .as_ref()
            .map(|c| c.timeout)
            .unwrap_or(Duration::from_secs(30));
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            config,
            http_client,
        }
    }

    pub async fn translate(&self, text: &str, language: &str) -> String {
        let Some(config) = &self.config else {
            return text.to_string();
        };
        if language == DEFAULT_LANGUAGE || text.trim().is_empty() {
            return text.to_string();
        }

        match self.request_translation(config, text, language).await {
            Ok(translated) => translated,
            Err(detail) => {
                warn!("translation to {language} failed, using original text: {detail}");
                text.to_string()
            }
        }
    }

    async fn request_translation(
        &self,
        config: &TranslateConfig,
        text: &str,
        language: &str,
    ) -> Result<String, String> {
        let mut payload = json!({
            "q": text,
            "source": DEFAULT_LANGUAGE,
            "target": language,
            "format": "text",
        });
        if let Some(api_key) = &config.api_key {
            payload["api_key"] = json!(api_key);
        }

        let response = self
            .http_client
            .post(&config.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }

        let body: TranslateResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(body.translated_text)
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_translator_passes_text_through() {
        let translator = Translator::new(None);
        assert_eq!(translator.translate("Trasig skärm", "en").await, "Trasig skärm");
    }

    #[tokio::test]
    async fn test_default_language_is_never_translated() {
        let config = TranslateConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: None,
            timeout: Duration::from_millis(100),
        };
        let translator = Translator::new(Some(config));
        assert_eq!(translator.translate("Hej", "sv").await, "Hej");
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_original_text() {
        // Port 9 (discard) is not listening; the request errors out.
        let config = TranslateConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: None,
            timeout: Duration::from_millis(100),
        };
        let translator = Translator::new(Some(config));
        assert_eq!(translator.translate("Hej", "en").await, "Hej");
    }
}
