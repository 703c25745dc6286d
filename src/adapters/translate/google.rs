//! Google Translate provider.
//!
//! Uses the unofficial Google Translate web endpoint (free tier). For
//! production, consider the official Google Cloud Translation API.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use isolang::Language;

use super::{config_str, TranslationProvider};
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{lang_code, parse_lang, AdapterConfig, Translation};

const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

pub struct GoogleTranslate {
    http: reqwest::Client,
    config: RwLock<AdapterConfig>,
}

impl GoogleTranslate {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent("Mozilla/5.0")
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            config: RwLock::new(AdapterConfig::new()),
        }
    }

    fn endpoint(&self) -> String {
        self.config
            .read()
            .ok()
            .and_then(|cfg| config_str(&cfg, "endpoint"))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }
}

impl Default for GoogleTranslate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslate {
    fn id(&self) -> &str {
        "google"
    }

    fn is_configured(&self) -> bool {
        // The web endpoint needs no credentials
        true
    }

    fn apply_config(&self, config: &AdapterConfig) {
        if let Ok(mut guard) = self.config.write() {
            *guard = config.clone();
        }
    }

    async fn translate(
        &self,
        text: &str,
        source: Option<Language>,
        target: Language,
    ) -> AppResult<Translation> {
        let source_code = source
            .map(|lang| lang_code(&lang))
            .unwrap_or_else(|| "auto".to_string());

        let url = format!(
            "{}?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.endpoint(),
            source_code,
            lang_code(&target),
            urlencoding::encode(text)
        );

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Translation(format!(
                "Translation API error: {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;

        let mut translated = String::new();
        if let Some(segments) = json.get(0).and_then(|v| v.as_array()) {
            for segment in segments {
                if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
                    translated.push_str(piece);
                }
            }
        }

        if translated.is_empty() {
            return Err(AppError::Translation(
                "Empty translation in API response".to_string(),
            ));
        }

        let detected = json
            .get(2)
            .and_then(|v| v.as_str())
            .and_then(parse_lang);

        Ok(Translation {
            text: translated,
            detected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_configured() {
        let provider = GoogleTranslate::new();
        assert!(provider.is_configured());
        assert_eq!(provider.id(), "google");
    }

    #[test]
    fn test_endpoint_override() {
        let provider = GoogleTranslate::new();
        assert_eq!(provider.endpoint(), DEFAULT_ENDPOINT);

        let mut config = AdapterConfig::new();
        config.insert("endpoint".to_string(), serde_json::json!("http://127.0.0.1:9999/t"));
        provider.apply_config(&config);
        assert_eq!(provider.endpoint(), "http://127.0.0.1:9999/t");
    }
}
