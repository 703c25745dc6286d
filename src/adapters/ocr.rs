//! OCR engine contract and built-in engines.

pub mod baidu;
pub mod paddle;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::instances::ManagedAdapter;
use crate::shared::error::AppResult;
use crate::shared::types::{AdapterConfig, Recognition};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrOptions {
    /// ISO 639-1 hint for engines that recognize per-language models.
    pub language_hint: Option<String>,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn id(&self) -> &str;

    /// Whether the engine can be invoked right now.
    fn is_available(&self) -> bool;

    /// Receive the merged configuration (on construction and live updates).
    fn apply_config(&self, config: &AdapterConfig);

    /// Recognize text in a base64-encoded image. Engines that find no text
    /// return `AppError::EmptyRecognition`, which the pipeline maps to a
    /// skip rather than a failure. `blocks` is optional; engines without
    /// geometry force the unified path.
    async fn recognize(&self, image_data: &str, options: &OcrOptions) -> AppResult<Recognition>;
}

impl ManagedAdapter for Arc<dyn OcrEngine> {
    fn apply_config(&self, config: &AdapterConfig) {
        OcrEngine::apply_config(self.as_ref(), config);
    }

    fn is_ready(&self) -> bool {
        self.is_available()
    }
}
