use std::collections::HashMap;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::shared::error::{AppError, AppResult};
use crate::shared::types::{AdapterConfig, PrivacyMode};

/// Application settings consumed by the orchestration core.
///
/// The settings store is owned by the surrounding application; the core only
/// reads merged values. `load()` is a convenience for standalone use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub languages: LanguageSettings,
    pub privacy: PrivacySettings,
    pub priorities: PrioritySettings,
    /// Adapter id -> field map, pushed into the instance cache on change.
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageSettings {
    /// "auto" delegates source detection to the pipeline.
    pub source_lang: String,
    pub target_lang: String,
    /// Used instead of `target_lang` when the detected source already
    /// equals the target (avoids a no-op translate-X-to-X request).
    pub secondary_lang: String,
    /// When true the target language is never swapped.
    pub target_locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacySettings {
    pub mode: PrivacyMode,
}

/// User overrides for adapter priority. A non-empty list fully replaces the
/// registry default for that operation; no merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrioritySettings {
    #[serde(default)]
    pub translation: Vec<String>,
    #[serde(default)]
    pub translation_streaming: Vec<String>,
    #[serde(default)]
    pub ocr: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            languages: LanguageSettings {
                source_lang: "auto".to_string(),
                target_lang: "zh".to_string(),
                secondary_lang: "en".to_string(),
                target_locked: false,
            },
            privacy: PrivacySettings {
                mode: PrivacyMode::Standard,
            },
            priorities: PrioritySettings::default(),
            adapters: HashMap::new(),
        }
    }
}

impl AppSettings {
    pub fn get_settings_path() -> AppResult<PathBuf> {
        ProjectDirs::from("com", "antigravity", "lingo-lens")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| AppError::System("Failed to determine config directory".to_string()))
    }

    pub async fn load() -> AppResult<Self> {
        let path = Self::get_settings_path()?;

        if !path.exists() {
            let settings = Self::default();
            settings.save_to_disk().await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::System(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| AppError::Validation(format!("Failed to parse settings: {}", e)))
    }

    async fn save_to_disk(&self) -> AppResult<()> {
        let path = Self::get_settings_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::System(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Validation(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&path, content)
            .await
            .map_err(|e| AppError::System(format!("Failed to write settings file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.languages.source_lang, "auto");
        assert!(!settings.languages.target_locked);
        assert_eq!(settings.privacy.mode, PrivacyMode::Standard);
        assert!(settings.priorities.translation.is_empty());
    }

    #[test]
    fn test_settings_roundtrip() {
        let mut settings = AppSettings::default();
        settings.priorities.ocr = vec!["paddle".to_string(), "baidu".to_string()];
        settings
            .adapters
            .entry("deepl".to_string())
            .or_default()
            .insert("api_key".to_string(), serde_json::json!("k-123"));

        let json = serde_json::to_string(&settings).unwrap();
        let parsed: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.priorities.ocr, settings.priorities.ocr);
        assert_eq!(
            parsed.adapters["deepl"]["api_key"],
            serde_json::json!("k-123")
        );
    }
}
