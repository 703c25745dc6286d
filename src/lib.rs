//! Screen translation orchestration core.
//!
//! Chains screen capture, OCR and machine translation over pluggable
//! backend registries with priority/privacy-aware fallback, input dedup,
//! and layout-aware rendering (one translated block vs. independently
//! positioned overlays). The windowing/UI layer, native capture primitives
//! and persisted configuration store live outside this crate and plug in
//! through the traits in [`capture`], [`adapters`] and [`core::selector`].

pub mod adapters;
pub mod capture;
pub mod core;
pub mod shared;

pub use crate::core::pipeline::{Orchestrator, PipelineState, PipelineStatus};
pub use crate::shared::error::{AppError, AppResult};
pub use crate::shared::settings::AppSettings;
pub use crate::shared::types::{OutputMode, PipelineResult, PrivacyMode};
