//! Bounded in-memory translation history.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::types::OutputMode;

/// Maximum number of history entries to keep
const MAX_HISTORY_SIZE: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub source_text: String,
    pub translated_text: String,
    pub provider: String,
    pub mode: OutputMode,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        source_text: impl Into<String>,
        translated_text: impl Into<String>,
        provider: impl Into<String>,
        mode: OutputMode,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_text: source_text.into(),
            translated_text: translated_text.into(),
            provider: provider.into(),
            mode,
            created_at: Utc::now(),
        }
    }
}

/// Translation history manager, newest first.
#[derive(Clone)]
pub struct TranslationHistory {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl TranslationHistory {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append an entry, suppressing an exact duplicate of the most recent
    /// one (repeat captures of the same screen produce identical entries).
    pub fn add(&self, entry: HistoryEntry) {
        let mut entries = self.lock();

        if let Some(last) = entries.first() {
            if last.source_text == entry.source_text
                && last.translated_text == entry.translated_text
            {
                log::debug!("[History] Skipping duplicate entry");
                return;
            }
        }

        entries.insert(0, entry);
        if entries.len() > MAX_HISTORY_SIZE {
            entries.truncate(MAX_HISTORY_SIZE);
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
        log::debug!("[History] Cleared");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HistoryEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for TranslationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_order() {
        let history = TranslationHistory::new();
        history.add(HistoryEntry::new("a", "A", "google", OutputMode::Unified));
        history.add(HistoryEntry::new("b", "B", "deepl", OutputMode::Unified));

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source_text, "b"); // Most recent first
        assert_eq!(entries[1].source_text, "a");
    }

    #[test]
    fn test_duplicate_suppression() {
        let history = TranslationHistory::new();
        history.add(HistoryEntry::new("same", "SAME", "google", OutputMode::Unified));
        history.add(HistoryEntry::new("same", "SAME", "google", OutputMode::Unified));

        assert_eq!(history.count(), 1);
    }

    #[test]
    fn test_capacity_cap() {
        let history = TranslationHistory::new();
        for i in 0..(MAX_HISTORY_SIZE + 10) {
            history.add(HistoryEntry::new(
                format!("src {}", i),
                format!("dst {}", i),
                "google",
                OutputMode::Unified,
            ));
        }
        assert_eq!(history.count(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_clear() {
        let history = TranslationHistory::new();
        history.add(HistoryEntry::new("a", "A", "google", OutputMode::Scattered));
        history.clear();
        assert_eq!(history.count(), 0);
    }
}
