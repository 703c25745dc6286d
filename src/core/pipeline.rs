//! Pipeline orchestrator: capture -> OCR -> dedup -> layout -> translation.
//!
//! One orchestrator instance is expected per process. A run is sequential
//! except for scattered-mode block translation, which dispatches bounded
//! batches. Overlapping runs are a caller responsibility: check
//! `is_busy()` before triggering a new capture. Errors from any backend are
//! contained; every run terminates in `Skipped`, `Done` or `Error`.

use std::sync::{Arc, RwLock};

use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::adapters::ocr::{baidu::BaiduOcr, paddle::PaddleOcr, OcrEngine, OcrOptions};
use crate::adapters::translate::{
    deepl::DeeplTranslate, google::GoogleTranslate, ollama::OllamaTranslate, ChunkSink,
    TranslationProvider,
};
use crate::capture::{CaptureOptions, CaptureSource};
use crate::core::dedup::{fingerprint, DedupCache};
use crate::core::detection::decide_languages;
use crate::core::fallback::run_chain;
use crate::core::history::{HistoryEntry, TranslationHistory};
use crate::core::instances::InstanceCache;
use crate::core::layout::{classify, LayoutKind, LayoutThresholds};
use crate::core::registry::{AdapterDescriptor, CapabilityRegistry, FieldSpec, LatencyClass};
use crate::core::selector::{candidates, PrivacyPolicy};
use crate::shared::error::AppError;
use crate::shared::settings::AppSettings;
use crate::shared::types::{
    AdapterConfig, BlockStatus, LogicalBlock, OutputMode, PipelineResult, PrivacyMode, TextBlock,
    UsageMode,
};

/// Upper bound on in-flight block translations in scattered mode. Bounds
/// backend load and UI churn, not correctness.
pub const SCATTER_CONCURRENCY: usize = 2;

pub type TranslatorRegistry = CapabilityRegistry<Arc<dyn TranslationProvider>>;
pub type OcrRegistry = CapabilityRegistry<Arc<dyn OcrEngine>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Idle,
    Capturing,
    Recognizing,
    Translating,
    Skipped,
    Done,
    Error,
}

/// Observable state container. The presentation layer polls this snapshot;
/// the core never pushes per-byte events.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub status: PipelineStatus,
    pub blocks: Vec<LogicalBlock>,
    pub last_result: Option<PipelineResult>,
}

impl PipelineState {
    fn new() -> Self {
        Self {
            status: PipelineStatus::Idle,
            blocks: Vec::new(),
            last_result: None,
        }
    }
}

pub struct Orchestrator {
    translators: TranslatorRegistry,
    engines: OcrRegistry,
    translator_cache: InstanceCache<Arc<dyn TranslationProvider>>,
    engine_cache: InstanceCache<Arc<dyn OcrEngine>>,
    dedup: DedupCache,
    history: TranslationHistory,
    settings: RwLock<AppSettings>,
    capture: Arc<dyn CaptureSource>,
    privacy: Arc<dyn PrivacyPolicy>,
    thresholds: LayoutThresholds,
    state: Arc<RwLock<PipelineState>>,
}

impl Orchestrator {
    /// An orchestrator with empty registries; adapters are registered by the
    /// caller. Most embedders want `with_default_adapters`.
    pub fn new(capture: Arc<dyn CaptureSource>, privacy: Arc<dyn PrivacyPolicy>) -> Self {
        Self {
            translators: CapabilityRegistry::new(),
            engines: CapabilityRegistry::new(),
            translator_cache: InstanceCache::new(),
            engine_cache: InstanceCache::new(),
            dedup: DedupCache::new(),
            history: TranslationHistory::new(),
            settings: RwLock::new(AppSettings::default()),
            capture,
            privacy,
            thresholds: LayoutThresholds::default(),
            state: Arc::new(RwLock::new(PipelineState::new())),
        }
    }

    /// An orchestrator with the built-in providers and engines registered
    /// and default priority lists set.
    pub fn with_default_adapters(
        capture: Arc<dyn CaptureSource>,
        privacy: Arc<dyn PrivacyPolicy>,
    ) -> Self {
        let mut orchestrator = Self::new(capture, privacy);
        orchestrator.register_defaults();
        orchestrator
    }

    fn register_defaults(&mut self) {
        self.translators.register(
            AdapterDescriptor::new("google", "Google Translate")
                .network(true)
                .latency(LatencyClass::Fast),
            || Arc::new(GoogleTranslate::new()) as Arc<dyn TranslationProvider>,
        );
        self.translators.register(
            AdapterDescriptor::new("deepl", "DeepL")
                .network(true)
                .latency(LatencyClass::Medium)
                .field("api_key", FieldSpec::required())
                .field("endpoint", FieldSpec::optional(None)),
            || Arc::new(DeeplTranslate::new()) as Arc<dyn TranslationProvider>,
        );
        self.translators.register(
            AdapterDescriptor::new("ollama", "Ollama (local)")
                .network(false)
                .latency(LatencyClass::Slow)
                .streaming(true)
                .field("endpoint", FieldSpec::optional(None))
                .field("model", FieldSpec::optional(None)),
            || Arc::new(OllamaTranslate::new()) as Arc<dyn TranslationProvider>,
        );
        // Interactive use prefers quality; streaming capture prefers the
        // low-latency network path.
        self.translators.set_default_priority(
            UsageMode::Interactive,
            vec!["deepl".into(), "google".into(), "ollama".into()],
        );
        self.translators.set_default_priority(
            UsageMode::Streaming,
            vec!["google".into(), "deepl".into(), "ollama".into()],
        );

        self.engines.register(
            AdapterDescriptor::new("paddle", "PaddleOCR (local)")
                .network(false)
                .latency(LatencyClass::Fast)
                .field("endpoint", FieldSpec::optional(None)),
            || Arc::new(PaddleOcr::new()) as Arc<dyn OcrEngine>,
        );
        self.engines.register(
            AdapterDescriptor::new("baidu", "Baidu OCR")
                .network(true)
                .latency(LatencyClass::Medium)
                .field("api_key", FieldSpec::required())
                .field("secret_key", FieldSpec::required()),
            || Arc::new(BaiduOcr::new()) as Arc<dyn OcrEngine>,
        );
        let ocr_order: Vec<String> = vec!["paddle".into(), "baidu".into()];
        self.engines
            .set_default_priority(UsageMode::Interactive, ocr_order.clone());
        self.engines
            .set_default_priority(UsageMode::Streaming, ocr_order);
    }

    pub fn translators_mut(&mut self) -> &mut TranslatorRegistry {
        &mut self.translators
    }

    pub fn engines_mut(&mut self) -> &mut OcrRegistry {
        &mut self.engines
    }

    pub fn set_layout_thresholds(&mut self, thresholds: LayoutThresholds) {
        self.thresholds = thresholds;
    }

    /// Replace the active settings and push per-adapter configuration into
    /// live instances.
    pub fn apply_settings(&self, settings: AppSettings) {
        for (id, fields) in &settings.adapters {
            self.set_adapter_config(id, fields.clone());
        }
        if let Ok(mut guard) = self.settings.write() {
            *guard = settings;
        }
    }

    /// Update one adapter's configuration, routed to whichever registry
    /// knows the id.
    pub fn set_adapter_config(&self, id: &str, fields: AdapterConfig) {
        if self.translators.has(id) {
            self.translator_cache
                .update_config(id, fields, &self.translators);
        } else if self.engines.has(id) {
            self.engine_cache.update_config(id, fields, &self.engines);
        } else {
            log::warn!("[Pipeline] Config update for unknown adapter id: {}", id);
        }
    }

    /// Drop all live adapter instances; they are recreated lazily with the
    /// current configuration.
    pub fn clear_instances(&self) {
        self.translator_cache.clear();
        self.engine_cache.clear();
    }

    /// Start a fresh capture session: clears dedup slots and the state
    /// container so a result identical to a stale previous one is not
    /// erroneously skipped.
    pub fn reset_session(&self) {
        self.dedup.reset();
        if let Ok(mut state) = self.state.write() {
            *state = PipelineState::new();
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.state
            .read()
            .map(|state| state.status)
            .unwrap_or(PipelineStatus::Idle)
    }

    /// True while a run is in flight. Callers must not trigger a new run
    /// while this holds; overlapping runs are not serialized internally.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.status(),
            PipelineStatus::Capturing | PipelineStatus::Recognizing | PipelineStatus::Translating
        )
    }

    pub fn state_snapshot(&self) -> PipelineState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_else(|_| PipelineState::new())
    }

    pub fn history(&self) -> &TranslationHistory {
        &self.history
    }

    pub fn translator_metadata(&self) -> Vec<AdapterDescriptor> {
        self.translators.list_metadata()
    }

    pub fn engine_metadata(&self) -> Vec<AdapterDescriptor> {
        self.engines.list_metadata()
    }

    /// Full capture -> OCR -> translate run.
    pub async fn run_capture_translation(&self, options: &CaptureOptions) -> PipelineResult {
        self.set_status(PipelineStatus::Capturing);
        self.set_blocks(Vec::new());

        let image = match self.capture.capture(options).await {
            Ok(image) => image,
            Err(err) => return self.finish_error(err),
        };

        self.set_status(PipelineStatus::Recognizing);

        let fp = fingerprint(&image.data);
        if self.dedup.check_and_update_image(&fp) {
            return self.finish_skipped("capture unchanged");
        }

        // Privacy is queried once per run, before any adapter selection
        let privacy = self.privacy.mode();
        let settings = self.settings_snapshot();

        let ocr_list = candidates(
            &self.engines,
            &settings.priorities.ocr,
            privacy,
            UsageMode::Interactive,
        );
        let ocr_options = OcrOptions {
            language_hint: match settings.languages.source_lang.as_str() {
                "auto" => None,
                pinned => Some(pinned.to_string()),
            },
        };

        let win = match run_chain(&ocr_list, &self.engines, &self.engine_cache, |_, engine| {
            let data = image.data.clone();
            let opts = ocr_options.clone();
            async move { engine.recognize(&data, &opts).await }
        })
        .await
        {
            Ok(win) => win,
            Err(failure) if failure.any_empty_result() => {
                return self.finish_skipped("no text in capture")
            }
            Err(failure) => return self.finish_error(failure.into_error(AppError::Recognition)),
        };
        let engine_id = win.winner;
        let recognition = win.value;

        if recognition.text.trim().is_empty() {
            return self.finish_skipped("empty recognition");
        }
        if self.dedup.check_and_update_text(&recognition.text) {
            return self.finish_skipped("recognized text unchanged");
        }

        // Prefer un-merged blocks: merging collapses independently
        // positioned lines before layout can be judged. No geometry at all
        // forces the unified path.
        let mode = match recognition
            .raw_blocks
            .as_deref()
            .or(recognition.blocks.as_deref())
        {
            Some(blocks) => classify(blocks, &self.thresholds),
            None => LayoutKind::Unified,
        };
        log::info!(
            "[Pipeline] OCR via {} ({} chars), layout {:?}",
            engine_id,
            recognition.text.len(),
            mode
        );

        self.set_status(PipelineStatus::Translating);
        match mode {
            LayoutKind::Unified => {
                self.translate_unified(&recognition.text, &settings, privacy, Some(engine_id))
                    .await
            }
            LayoutKind::Scattered => {
                let blocks: &[TextBlock] = recognition
                    .blocks
                    .as_deref()
                    .or(recognition.raw_blocks.as_deref())
                    .unwrap_or(&[]);
                self.translate_scattered(blocks, image.scale_factor, &settings, privacy, engine_id)
                    .await
            }
        }
    }

    /// Translate already-selected text, skipping capture, OCR and layout.
    pub async fn run_text_translation(&self, text: &str) -> PipelineResult {
        if text.trim().is_empty() {
            return self.finish_error(AppError::Validation("Nothing to translate".to_string()));
        }
        self.set_status(PipelineStatus::Translating);
        self.set_blocks(Vec::new());

        if self.dedup.check_and_update_text(text) {
            return self.finish_skipped("text unchanged");
        }

        let privacy = self.privacy.mode();
        let settings = self.settings_snapshot();
        self.translate_unified(text, &settings, privacy, None).await
    }

    /// Streaming text translation for high-frequency capture. Candidates
    /// with streaming support feed `on_chunk` with accumulated partial
    /// output; the rest fall back to the plain call.
    pub async fn run_text_translation_stream(
        &self,
        text: &str,
        on_chunk: ChunkSink<'_>,
    ) -> PipelineResult {
        if text.trim().is_empty() {
            return self.finish_error(AppError::Validation("Nothing to translate".to_string()));
        }
        self.set_status(PipelineStatus::Translating);
        self.set_blocks(Vec::new());

        if self.dedup.check_and_update_text(text) {
            return self.finish_skipped("text unchanged");
        }

        let privacy = self.privacy.mode();
        let settings = self.settings_snapshot();
        let (source, target) = decide_languages(text, &settings.languages);

        let list = candidates(
            &self.translators,
            &settings.priorities.translation_streaming,
            privacy,
            UsageMode::Streaming,
        );

        let outcome = run_chain(
            &list,
            &self.translators,
            &self.translator_cache,
            |id, provider| {
                let text = text.to_string();
                let streaming = self
                    .translators
                    .descriptor(id)
                    .map(|d| d.supports_streaming)
                    .unwrap_or(false);
                async move {
                    if streaming {
                        provider
                            .translate_stream(&text, source, target, on_chunk)
                            .await
                    } else {
                        provider.translate(&text, source, target).await
                    }
                }
            },
        )
        .await;

        match outcome {
            Ok(win) => {
                let cleaned = strip_boilerplate(&win.value.text);
                self.history.add(HistoryEntry::new(
                    text,
                    &cleaned,
                    &win.winner,
                    OutputMode::Unified,
                ));
                self.finish_done(PipelineResult {
                    success: true,
                    text: Some(cleaned),
                    error: None,
                    provider: Some(win.winner),
                    engine: None,
                    mode: OutputMode::Unified,
                    skipped: false,
                })
            }
            Err(failure) => self.finish_error(failure.into_error(AppError::Translation)),
        }
    }

    async fn translate_unified(
        &self,
        text: &str,
        settings: &AppSettings,
        privacy: PrivacyMode,
        engine: Option<String>,
    ) -> PipelineResult {
        let (source, target) = decide_languages(text, &settings.languages);
        let list = candidates(
            &self.translators,
            &settings.priorities.translation,
            privacy,
            UsageMode::Interactive,
        );

        let outcome = run_chain(
            &list,
            &self.translators,
            &self.translator_cache,
            |_, provider| {
                let text = text.to_string();
                async move { provider.translate(&text, source, target).await }
            },
        )
        .await;

        match outcome {
            Ok(win) => {
                let cleaned = strip_boilerplate(&win.value.text);
                self.history.add(HistoryEntry::new(
                    text,
                    &cleaned,
                    &win.winner,
                    OutputMode::Unified,
                ));
                self.finish_done(PipelineResult {
                    success: true,
                    text: Some(cleaned),
                    error: None,
                    provider: Some(win.winner),
                    engine,
                    mode: OutputMode::Unified,
                    skipped: false,
                })
            }
            Err(failure) => self.finish_error(failure.into_error(AppError::Translation)),
        }
    }

    async fn translate_scattered(
        &self,
        blocks: &[TextBlock],
        scale_factor: f64,
        settings: &AppSettings,
        privacy: PrivacyMode,
        engine_id: String,
    ) -> PipelineResult {
        let logical: Vec<LogicalBlock> = blocks
            .iter()
            .map(|block| LogicalBlock::from_block(block, scale_factor))
            .filter(LogicalBlock::is_translatable)
            .collect();

        if logical.is_empty() {
            return self.finish_skipped("no translatable blocks");
        }

        let count = logical.len();
        let texts: Vec<String> = logical.iter().map(|block| block.text.clone()).collect();
        self.set_blocks(logical);

        let list = candidates(
            &self.translators,
            &settings.priorities.translation,
            privacy,
            UsageMode::Interactive,
        );

        let mut winners: Vec<Option<String>> = vec![None; count];
        let indices: Vec<usize> = (0..count).collect();

        // Sequential batches, each awaited in full, so at most
        // SCATTER_CONCURRENCY translations are ever unresolved at once.
        for batch in indices.chunks(SCATTER_CONCURRENCY) {
            let futures = batch.iter().map(|&index| {
                let list = list.clone();
                let text = texts[index].clone();
                async move {
                    self.set_block_status(index, BlockStatus::Translating);
                    let (source, target) = decide_languages(&text, &settings.languages);
                    let outcome = run_chain(
                        &list,
                        &self.translators,
                        &self.translator_cache,
                        |_, provider| {
                            let text = text.clone();
                            async move { provider.translate(&text, source, target).await }
                        },
                    )
                    .await;
                    (index, outcome)
                }
            });

            for (index, outcome) in join_all(futures).await {
                match outcome {
                    Ok(win) => {
                        winners[index] = Some(win.winner);
                        self.resolve_block(index, Ok(strip_boilerplate(&win.value.text)));
                    }
                    Err(failure) => {
                        let err = failure.into_error(AppError::Translation);
                        log::warn!("[Pipeline] Block {} failed: {}", index, err);
                        self.resolve_block(index, Err(err.user_message()));
                    }
                }
            }
        }

        let final_blocks = self.state_snapshot().blocks;
        let succeeded = final_blocks
            .iter()
            .filter(|block| block.status == BlockStatus::Done)
            .count();

        if succeeded == 0 {
            return self.finish_error(AppError::Translation(
                "All text regions failed to translate".to_string(),
            ));
        }

        // One combined history entry for the whole scatter run
        let combined_source = final_blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let combined_translated = final_blocks
            .iter()
            .map(|block| block.translated.as_deref().unwrap_or(block.text.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        let provider = winners.iter().flatten().next().cloned();

        self.history.add(HistoryEntry::new(
            &combined_source,
            &combined_translated,
            provider.as_deref().unwrap_or("unknown"),
            OutputMode::Scattered,
        ));

        log::info!(
            "[Pipeline] Scattered run complete: {}/{} blocks translated",
            succeeded,
            count
        );

        self.finish_done(PipelineResult {
            success: true,
            text: Some(combined_translated),
            error: None,
            provider,
            engine: Some(engine_id),
            mode: OutputMode::Scattered,
            skipped: false,
        })
    }

    fn settings_snapshot(&self) -> AppSettings {
        self.settings
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn set_status(&self, status: PipelineStatus) {
        if let Ok(mut state) = self.state.write() {
            state.status = status;
        }
    }

    fn set_blocks(&self, blocks: Vec<LogicalBlock>) {
        if let Ok(mut state) = self.state.write() {
            state.blocks = blocks;
        }
    }

    fn set_block_status(&self, index: usize, status: BlockStatus) {
        if let Ok(mut state) = self.state.write() {
            if let Some(block) = state.blocks.get_mut(index) {
                block.status = status;
            }
        }
    }

    fn resolve_block(&self, index: usize, result: Result<String, String>) {
        if let Ok(mut state) = self.state.write() {
            if let Some(block) = state.blocks.get_mut(index) {
                match result {
                    Ok(translated) => {
                        block.translated = Some(translated);
                        block.status = BlockStatus::Done;
                    }
                    Err(message) => {
                        block.error = Some(message);
                        block.status = BlockStatus::Error;
                    }
                }
            }
        }
    }

    fn finish_skipped(&self, reason: &str) -> PipelineResult {
        log::info!("[Pipeline] Skipped: {}", reason);
        let result = PipelineResult::skipped();
        self.store_result(PipelineStatus::Skipped, result.clone());
        result
    }

    fn finish_done(&self, result: PipelineResult) -> PipelineResult {
        self.store_result(PipelineStatus::Done, result.clone());
        result
    }

    fn finish_error(&self, err: AppError) -> PipelineResult {
        // Full diagnostics go to the log; the surfaced message is short
        log::error!("[Pipeline] Run failed: {}", err);
        let result = PipelineResult::failed(&err);
        self.store_result(PipelineStatus::Error, result.clone());
        result
    }

    fn store_result(&self, status: PipelineStatus, result: PipelineResult) {
        if let Ok(mut state) = self.state.write() {
            state.status = status;
            state.last_result = Some(result);
        }
    }
}

static BOILERPLATE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*(?:sure[,!.]?\s*)?(?:here(?:\s+is|'s)\s+the\s+translation|translation\s+result|translated\s+text|translation|译文|翻译结果|翻译)\s*[:：]\s*"#,
    )
    .expect("valid boilerplate regex")
});

/// Strip translator/model boilerplate from raw output: leading
/// "Translation:"-style prefixes and one layer of wrapping quotes.
pub fn strip_boilerplate(raw: &str) -> String {
    let mut text = raw.trim();

    while let Some(found) = BOILERPLATE_PREFIX.find(text) {
        if found.start() != 0 || found.end() == 0 {
            break;
        }
        text = text[found.end()..].trim_start();
    }

    for (open, close) in [("\"", "\""), ("“", "”"), ("「", "」")] {
        if text.len() > open.len() + close.len()
            && text.starts_with(open)
            && text.ends_with(close)
        {
            text = text[open.len()..text.len() - close.len()].trim();
            break;
        }
    }

    text.to_string()
}
