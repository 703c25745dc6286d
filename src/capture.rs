//! Screen capture collaborator boundary.
//!
//! The native capture layer lives outside this crate; the core only sees an
//! opaque base64 payload plus the display scale factor needed to project
//! OCR geometry into UI space.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppResult;

/// Screen region in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Region to grab; `None` captures the full screen.
    pub region: Option<CaptureRegion>,
    /// Display to capture from when several are attached.
    pub display_id: Option<u32>,
}

/// One captured frame. `data` is a base64-encoded image the core never
/// decodes; it is only fingerprinted and handed to OCR engines.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub data: String,
    pub scale_factor: f64,
}

#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn capture(&self, options: &CaptureOptions) -> AppResult<CapturedImage>;
}
