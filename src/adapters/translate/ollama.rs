//! Ollama provider: translation through a local inference endpoint.
//!
//! Counts as a non-network adapter for privacy purposes since nothing
//! leaves the machine. Supports streaming via Ollama's NDJSON responses.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use isolang::Language;
use serde::Deserialize;

use super::{config_str, ChunkSink, TranslationProvider};
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{AdapterConfig, Translation};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";
const DEFAULT_MODEL: &str = "qwen2.5:7b";
const DEFAULT_PROMPT: &str = "Translate the following text from {source} to {target}. \
Output only the translation, without explanations.\n\n{text}";

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

pub struct OllamaTranslate {
    http: reqwest::Client,
    config: RwLock<AdapterConfig>,
}

impl OllamaTranslate {
    pub fn new() -> Self {
        Self {
            // Local models can be slow to produce a full answer
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            config: RwLock::new(AdapterConfig::new()),
        }
    }

    fn field(&self, key: &str, fallback: &str) -> String {
        self.config
            .read()
            .ok()
            .and_then(|cfg| config_str(&cfg, key))
            .unwrap_or_else(|| fallback.to_string())
    }

    fn build_prompt(&self, text: &str, source: Option<Language>, target: Language) -> String {
        let source_name = source.map(|l| l.to_name()).unwrap_or("the detected language");
        self.field("prompt", DEFAULT_PROMPT)
            .replace("{source}", source_name)
            .replace("{target}", target.to_name())
            .replace("{text}", text)
    }

    async fn send_generate(
        &self,
        prompt: &str,
        stream: bool,
    ) -> AppResult<reqwest::Response> {
        let url = format!("{}/api/generate", self.field("endpoint", DEFAULT_ENDPOINT));
        let body = serde_json::json!({
            "model": self.field("model", DEFAULT_MODEL),
            "prompt": prompt,
            "stream": stream,
        });

        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Translation(format!(
                "Ollama returned {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

impl Default for OllamaTranslate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for OllamaTranslate {
    fn id(&self) -> &str {
        "ollama"
    }

    fn is_configured(&self) -> bool {
        // Endpoint and model have defaults
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
        let prompt = self.build_prompt(text, source, target);
        let response = self.send_generate(&prompt, false).await?;

        let chunk: GenerateChunk = response.json().await?;
        if chunk.response.trim().is_empty() {
            return Err(AppError::Translation("Ollama returned empty output".to_string()));
        }

        Ok(Translation {
            text: chunk.response.trim().to_string(),
            detected: None,
        })
    }

    async fn translate_stream(
        &self,
        text: &str,
        source: Option<Language>,
        target: Language,
        on_chunk: ChunkSink<'_>,
    ) -> AppResult<Translation> {
        let prompt = self.build_prompt(text, source, target);
        let mut response = self.send_generate(&prompt, true).await?;

        let mut accumulated = String::new();
        let mut line_buffer = String::new();

        while let Some(bytes) = response.chunk().await? {
            line_buffer.push_str(&String::from_utf8_lossy(&bytes));

            // NDJSON: one JSON object per line, possibly split across chunks
            while let Some(newline) = line_buffer.find('\n') {
                let line: String = line_buffer.drain(..=newline).collect();
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let parsed: GenerateChunk = serde_json::from_str(line).map_err(|e| {
                    AppError::Translation(format!("Malformed Ollama stream chunk: {}", e))
                })?;
                if !parsed.response.is_empty() {
                    accumulated.push_str(&parsed.response);
                    on_chunk(&accumulated);
                }
                if parsed.done {
                    break;
                }
            }
        }

        if accumulated.trim().is_empty() {
            return Err(AppError::Translation("Ollama stream produced no output".to_string()));
        }

        Ok(Translation {
            text: accumulated.trim().to_string(),
            detected: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_substitution() {
        let provider = OllamaTranslate::new();
        let prompt = provider.build_prompt("Bonjour", Some(Language::Fra), Language::Eng);
        assert!(prompt.contains("Bonjour"));
        assert!(prompt.contains("French"));
        assert!(prompt.contains("English"));
    }

    #[test]
    fn test_prompt_auto_source() {
        let provider = OllamaTranslate::new();
        let prompt = provider.build_prompt("hola", None, Language::Eng);
        assert!(prompt.contains("the detected language"));
    }

    #[test]
    fn test_custom_model_field() {
        let provider = OllamaTranslate::new();
        let mut config = AdapterConfig::new();
        config.insert("model".to_string(), serde_json::json!("llama3.2"));
        provider.apply_config(&config);
        assert_eq!(provider.field("model", DEFAULT_MODEL), "llama3.2");
    }
}
