//! PaddleOCR engine, backed by a local PaddleOCR-json HTTP server.
//!
//! The server answers `{"code": 100, "data": [...]}` with one entry per
//! recognized line, `code` 101 when the image contains no text. Runs
//! entirely on-device, so it stays eligible under offline privacy modes.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{OcrEngine, OcrOptions};
use crate::adapters::translate::config_str;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{AdapterConfig, BoundingBox, Recognition, TextBlock};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:1224/api/ocr";
const CODE_OK: i64 = 100;
const CODE_NO_TEXT: i64 = 101;

/// Lines whose vertical gap is below this fraction of line height are
/// merged into one paragraph block.
const MERGE_GAP_FACTOR: f64 = 0.6;

#[derive(Debug, Deserialize)]
struct PaddleResponse {
    code: i64,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PaddleLine {
    text: String,
    /// Quad corners, clockwise from top-left: [[x,y]; 4]
    #[serde(rename = "box")]
    quad: Vec<[f64; 2]>,
}

pub struct PaddleOcr {
    http: reqwest::Client,
    config: RwLock<AdapterConfig>,
}

impl PaddleOcr {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
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

    fn quad_to_box(quad: &[[f64; 2]]) -> Option<BoundingBox> {
        if quad.is_empty() {
            return None;
        }
        let xs = quad.iter().map(|p| p[0]);
        let ys = quad.iter().map(|p| p[1]);
        let min_x = xs.clone().fold(f64::INFINITY, f64::min);
        let max_x = xs.fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.clone().fold(f64::INFINITY, f64::min);
        let max_y = ys.fold(f64::NEG_INFINITY, f64::max);
        Some(BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Merge vertically adjacent lines into paragraph blocks. The un-merged
    /// lines are kept alongside so layout analysis can see real geometry.
    fn merge_lines(lines: &[TextBlock]) -> Vec<TextBlock> {
        let mut sorted: Vec<&TextBlock> = lines.iter().collect();
        sorted.sort_by(|a, b| {
            a.bounding_box
                .y
                .partial_cmp(&b.bounding_box.y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut merged: Vec<TextBlock> = Vec::new();
        for line in sorted {
            let joinable = merged.last().map(|prev: &TextBlock| {
                let gap = line.bounding_box.y - prev.bounding_box.bottom();
                let line_height = line.bounding_box.height.max(1.0);
                gap >= 0.0 && gap < MERGE_GAP_FACTOR * line_height
            });

            if joinable == Some(true) {
                if let Some(prev) = merged.last_mut() {
                    prev.text.push('\n');
                    prev.text.push_str(&line.text);
                    prev.merged_count += 1;

                    let b = &mut prev.bounding_box;
                    let right = b.x + b.width;
                    let new_right = line.bounding_box.x + line.bounding_box.width;
                    b.x = b.x.min(line.bounding_box.x);
                    b.width = right.max(new_right) - b.x;
                    b.height = line.bounding_box.bottom() - b.y;
                    continue;
                }
            }
            merged.push(line.clone());
        }
        merged
    }
}

impl Default for PaddleOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for PaddleOcr {
    fn id(&self) -> &str {
        "paddle"
    }

    fn is_available(&self) -> bool {
        // Endpoint has a default; reachability surfaces as a call failure
        true
    }

    fn apply_config(&self, config: &AdapterConfig) {
        if let Ok(mut guard) = self.config.write() {
            *guard = config.clone();
        }
    }

    async fn recognize(&self, image_data: &str, _options: &OcrOptions) -> AppResult<Recognition> {
        let body = serde_json::json!({ "base64": image_data });
        let response = self.http.post(self.endpoint()).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Recognition(format!(
                "PaddleOCR server returned {}",
                response.status()
            )));
        }

        let parsed: PaddleResponse = response.json().await?;
        match parsed.code {
            CODE_OK => {}
            CODE_NO_TEXT => return Err(AppError::EmptyRecognition),
            other => {
                return Err(AppError::Recognition(format!(
                    "PaddleOCR error code {}: {}",
                    other, parsed.data
                )))
            }
        }

        let lines: Vec<PaddleLine> = serde_json::from_value(parsed.data)
            .map_err(|e| AppError::Recognition(format!("Malformed PaddleOCR payload: {}", e)))?;

        let raw_blocks: Vec<TextBlock> = lines
            .iter()
            .filter_map(|line| {
                Self::quad_to_box(&line.quad).map(|bbox| TextBlock::new(line.text.clone(), bbox))
            })
            .collect();

        if raw_blocks.is_empty() {
            return Err(AppError::EmptyRecognition);
        }

        let blocks = Self::merge_lines(&raw_blocks);
        let text = raw_blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Recognition {
            text,
            blocks: Some(blocks),
            raw_blocks: Some(raw_blocks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, x: f64, y: f64, w: f64, h: f64) -> TextBlock {
        TextBlock::new(text, BoundingBox::new(x, y, w, h))
    }

    #[test]
    fn test_quad_to_box() {
        let quad = vec![[10.0, 5.0], [110.0, 5.0], [110.0, 25.0], [10.0, 25.0]];
        let bbox = PaddleOcr::quad_to_box(&quad).unwrap();
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.y, 5.0);
        assert_eq!(bbox.width, 100.0);
        assert_eq!(bbox.height, 20.0);
        assert!(PaddleOcr::quad_to_box(&[]).is_none());
    }

    #[test]
    fn test_adjacent_lines_merge() {
        let lines = vec![
            line("first", 0.0, 0.0, 100.0, 20.0),
            line("second", 0.0, 25.0, 100.0, 20.0),
        ];
        let merged = PaddleOcr::merge_lines(&lines);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "first\nsecond");
        assert_eq!(merged[0].merged_count, 2);
        assert_eq!(merged[0].bounding_box.bottom(), 45.0);
    }

    #[test]
    fn test_distant_lines_stay_separate() {
        let lines = vec![
            line("title", 0.0, 0.0, 100.0, 20.0),
            line("footer", 0.0, 300.0, 100.0, 20.0),
        ];
        let merged = PaddleOcr::merge_lines(&lines);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].merged_count, 1);
    }
}
