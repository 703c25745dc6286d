//! Baidu cloud OCR engine. Requires an API key and secret key.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use super::{OcrEngine, OcrOptions};
use crate::adapters::translate::config_str;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{AdapterConfig, BoundingBox, Recognition, TextBlock};

const TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";
const OCR_URL: &str = "https://aip.baidubce.com/rest/2.0/ocr/v1/general";
const TOKEN_TTL: Duration = Duration::from_secs(25 * 24 * 3600);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    words_result: Vec<WordResult>,
    error_code: Option<i64>,
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WordResult {
    words: String,
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

pub struct BaiduOcr {
    http: reqwest::Client,
    config: RwLock<AdapterConfig>,
    token: RwLock<Option<(String, Instant)>>,
}

impl BaiduOcr {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
            config: RwLock::new(AdapterConfig::new()),
            token: RwLock::new(None),
        }
    }

    fn field(&self, key: &str) -> Option<String> {
        self.config.read().ok().and_then(|cfg| config_str(&cfg, key))
    }

    async fn access_token(&self) -> AppResult<String> {
        if let Ok(guard) = self.token.read() {
            if let Some((token, fetched)) = guard.as_ref() {
                if fetched.elapsed() < TOKEN_TTL {
                    return Ok(token.clone());
                }
            }
        }

        let api_key = self
            .field("api_key")
            .ok_or_else(|| AppError::Configuration("Baidu API key not set".to_string()))?;
        let secret_key = self
            .field("secret_key")
            .ok_or_else(|| AppError::Configuration("Baidu secret key not set".to_string()))?;

        let response = self
            .http
            .post(TOKEN_URL)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", api_key.as_str()),
                ("client_secret", secret_key.as_str()),
            ])
            .send()
            .await?;

        let parsed: TokenResponse = response.json().await?;
        let token = parsed
            .access_token
            .ok_or_else(|| AppError::Recognition("Baidu token request rejected".to_string()))?;

        if let Ok(mut guard) = self.token.write() {
            *guard = Some((token.clone(), Instant::now()));
        }
        Ok(token)
    }
}

impl Default for BaiduOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for BaiduOcr {
    fn id(&self) -> &str {
        "baidu"
    }

    fn is_available(&self) -> bool {
        self.field("api_key").is_some() && self.field("secret_key").is_some()
    }

    fn apply_config(&self, config: &AdapterConfig) {
        if let Ok(mut guard) = self.config.write() {
            *guard = config.clone();
        }
        // Credentials may have changed; drop the cached token
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    async fn recognize(&self, image_data: &str, options: &OcrOptions) -> AppResult<Recognition> {
        let token = self.access_token().await?;

        let mut form: Vec<(&str, String)> = vec![("image", image_data.to_string())];
        if let Some(hint) = &options.language_hint {
            form.push(("language_type", hint.to_uppercase()));
        }

        let response = self
            .http
            .post(OCR_URL)
            .query(&[("access_token", token.as_str())])
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Recognition(format!(
                "Baidu OCR returned {}",
                response.status()
            )));
        }

        let parsed: OcrResponse = response.json().await?;
        if let Some(code) = parsed.error_code {
            return Err(AppError::Recognition(format!(
                "Baidu OCR error {}: {}",
                code,
                parsed.error_msg.unwrap_or_default()
            )));
        }

        if parsed.words_result.is_empty() {
            return Err(AppError::EmptyRecognition);
        }

        let blocks: Vec<TextBlock> = parsed
            .words_result
            .into_iter()
            .map(|word| {
                TextBlock::new(
                    word.words,
                    BoundingBox::new(
                        word.location.left,
                        word.location.top,
                        word.location.width,
                        word.location.height,
                    ),
                )
            })
            .collect();

        let text = blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Recognition {
            text,
            raw_blocks: Some(blocks.clone()),
            blocks: Some(blocks),
        })
    }
}
