use std::collections::HashMap;

use isolang::Language;
use serde::{Deserialize, Serialize};

/// Per-adapter configuration: field name -> value, shallow-merged on update.
pub type AdapterConfig = HashMap<String, serde_json::Value>;

pub fn lang_code(lang: &Language) -> String {
    lang.to_639_1()
        .map(|c| c.to_string())
        .unwrap_or_else(|| lang.to_639_3().to_string())
}

pub fn parse_lang(code: &str) -> Option<Language> {
    Language::from_639_1(code).or_else(|| Language::from_639_3(code))
}

/// Privacy mode gating which adapters are eligible for a run.
///
/// Network-requiring adapters are excluded under `Offline` and `Strict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyMode {
    #[default]
    Standard,
    Offline,
    Strict,
    Secure,
}

impl PrivacyMode {
    /// Whether adapters with `requires_network = true` may be used.
    pub fn allows_network(&self) -> bool {
        !matches!(self, PrivacyMode::Offline | PrivacyMode::Strict)
    }
}

/// Usage mode an adapter is being selected for. Streaming capture runs at
/// high frequency and biases the default priority list toward low latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageMode {
    Interactive,
    Streaming,
}

/// Axis-aligned box in device pixels, as reported by OCR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// One positioned piece of recognized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub bounding_box: BoundingBox,
    /// How many raw OCR lines were merged into this block (1 = unmerged).
    pub merged_count: u32,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bounding_box,
            merged_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Pending,
    Translating,
    Done,
    Error,
}

/// A `TextBlock` projected into UI space, carrying its own translation state.
/// Only used in scattered mode, where each block becomes one overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalBlock {
    pub text: String,
    /// Bounding box divided by the display scale factor.
    pub bounding_box: BoundingBox,
    pub status: BlockStatus,
    pub translated: Option<String>,
    pub error: Option<String>,
}

impl LogicalBlock {
    /// Project a device-pixel block into UI coordinates.
    pub fn from_block(block: &TextBlock, scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self {
            text: block.text.clone(),
            bounding_box: BoundingBox::new(
                block.bounding_box.x / scale,
                block.bounding_box.y / scale,
                block.bounding_box.width / scale,
                block.bounding_box.height / scale,
            ),
            status: BlockStatus::Pending,
            translated: None,
            error: None,
        }
    }

    /// Blocks without text or area are never dispatched for translation.
    pub fn is_translatable(&self) -> bool {
        !self.text.trim().is_empty() && self.bounding_box.has_area()
    }
}

/// How the translated output should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Unified,
    Scattered,
}

/// Terminal outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    pub text: Option<String>,
    pub error: Option<String>,
    /// Id of the winning translation provider (unified) or OCR engine.
    pub provider: Option<String>,
    pub engine: Option<String>,
    pub mode: OutputMode,
    /// True when the run was short-circuited before any backend call.
    pub skipped: bool,
}

impl PipelineResult {
    pub fn skipped() -> Self {
        Self {
            success: true,
            text: None,
            error: None,
            provider: None,
            engine: None,
            mode: OutputMode::Unified,
            skipped: true,
        }
    }

    pub fn failed(error: &super::error::AppError) -> Self {
        Self {
            success: false,
            text: None,
            error: Some(error.user_message()),
            provider: None,
            engine: None,
            mode: OutputMode::Unified,
            skipped: false,
        }
    }
}

/// Result of one translation call.
#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub detected: Option<Language>,
}

/// OCR output for one image.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    pub text: String,
    /// Positioned blocks, possibly merged into paragraphs by the engine.
    pub blocks: Option<Vec<TextBlock>>,
    /// Un-merged line blocks when the engine keeps them; preferred for
    /// layout analysis since merging collapses independent lines.
    pub raw_blocks: Option<Vec<TextBlock>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_mode_network_gate() {
        assert!(PrivacyMode::Standard.allows_network());
        assert!(PrivacyMode::Secure.allows_network());
        assert!(!PrivacyMode::Offline.allows_network());
        assert!(!PrivacyMode::Strict.allows_network());
    }

    #[test]
    fn test_logical_block_scaling() {
        let block = TextBlock::new("hi", BoundingBox::new(200.0, 100.0, 40.0, 20.0));
        let logical = LogicalBlock::from_block(&block, 2.0);
        assert_eq!(logical.bounding_box.x, 100.0);
        assert_eq!(logical.bounding_box.y, 50.0);
        assert_eq!(logical.bounding_box.width, 20.0);
        assert_eq!(logical.bounding_box.height, 10.0);
        assert_eq!(logical.status, BlockStatus::Pending);
    }

    #[test]
    fn test_logical_block_translatable() {
        let ok = LogicalBlock::from_block(
            &TextBlock::new("text", BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            1.0,
        );
        assert!(ok.is_translatable());

        let empty = LogicalBlock::from_block(
            &TextBlock::new("   ", BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            1.0,
        );
        assert!(!empty.is_translatable());

        let flat = LogicalBlock::from_block(
            &TextBlock::new("text", BoundingBox::new(0.0, 0.0, 10.0, 0.0)),
            1.0,
        );
        assert!(!flat.is_translatable());
    }

    #[test]
    fn test_lang_code_roundtrip() {
        let lang = parse_lang("zh").unwrap();
        assert_eq!(lang_code(&lang), "zh");
        assert!(parse_lang("not-a-lang").is_none());
    }
}
