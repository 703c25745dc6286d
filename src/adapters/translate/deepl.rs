//! DeepL cloud translation provider. Requires an API key.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use isolang::Language;
use serde::Deserialize;

use super::{config_str, TranslationProvider};
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{lang_code, parse_lang, AdapterConfig, Translation};

const DEFAULT_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";

#[derive(Debug, Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeeplTranslation {
    text: String,
    detected_source_language: Option<String>,
}

pub struct DeeplTranslate {
    http: reqwest::Client,
    config: RwLock<AdapterConfig>,
}

impl DeeplTranslate {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            config: RwLock::new(AdapterConfig::new()),
        }
    }

    fn field(&self, key: &str) -> Option<String> {
        self.config.read().ok().and_then(|cfg| config_str(&cfg, key))
    }
}

impl Default for DeeplTranslate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for DeeplTranslate {
    fn id(&self) -> &str {
        "deepl"
    }

    fn is_configured(&self) -> bool {
        self.field("api_key").is_some()
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
        let api_key = self
            .field("api_key")
            .ok_or_else(|| AppError::Configuration("DeepL API key not set".to_string()))?;
        let endpoint = self
            .field("endpoint")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let mut form: Vec<(&str, String)> = vec![
            ("text", text.to_string()),
            ("target_lang", lang_code(&target).to_uppercase()),
        ];
        if let Some(lang) = source {
            form.push(("source_lang", lang_code(&lang).to_uppercase()));
        }

        let response = self
            .http
            .post(&endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Translation(format!(
                "DeepL API error: {}",
                status
            )));
        }

        let parsed: DeeplResponse = response.json().await?;
        let first = parsed
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Translation("DeepL returned no translations".to_string()))?;

        Ok(Translation {
            text: first.text,
            detected: first
                .detected_source_language
                .as_deref()
                .map(str::to_ascii_lowercase)
                .as_deref()
                .and_then(parse_lang),
        })
    }
}
