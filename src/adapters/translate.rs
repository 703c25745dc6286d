//! Translation provider contract and built-in providers.

pub mod deepl;
pub mod google;
pub mod ollama;

use std::sync::Arc;

use async_trait::async_trait;
use isolang::Language;

use crate::core::instances::ManagedAdapter;
use crate::shared::error::AppResult;
use crate::shared::types::{AdapterConfig, Translation};

/// Sink for partial output during streaming translation.
pub type ChunkSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Whether required configuration is present. Unconfigured providers are
    /// skipped by the fallback chain, never invoked.
    fn is_configured(&self) -> bool;

    /// Receive the merged configuration. Called on first construction and
    /// again, live, whenever the stored configuration changes.
    fn apply_config(&self, config: &AdapterConfig);

    /// Translate `text`. `source` of `None` asks the backend to detect.
    async fn translate(
        &self,
        text: &str,
        source: Option<Language>,
        target: Language,
    ) -> AppResult<Translation>;

    /// Streaming variant: `on_chunk` receives the accumulated partial text
    /// zero or more times before the final translation resolves. Providers
    /// without native streaming inherit this non-streaming fallback.
    async fn translate_stream(
        &self,
        text: &str,
        source: Option<Language>,
        target: Language,
        on_chunk: ChunkSink<'_>,
    ) -> AppResult<Translation> {
        let _ = on_chunk;
        self.translate(text, source, target).await
    }
}

impl ManagedAdapter for Arc<dyn TranslationProvider> {
    fn apply_config(&self, config: &AdapterConfig) {
        TranslationProvider::apply_config(self.as_ref(), config);
    }

    fn is_ready(&self) -> bool {
        self.is_configured()
    }
}

/// String field lookup shared by the built-in providers.
pub(crate) fn config_str(config: &AdapterConfig, key: &str) -> Option<String> {
    config
        .get(key)
        .and_then(|value| value.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
