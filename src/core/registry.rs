//! Capability registry for backend adapters.
//!
//! Two instances of the same registry type exist at runtime: one for
//! translation providers and one for OCR engines. An entry couples a static
//! descriptor (declared capabilities) with a factory that builds a fresh,
//! unconfigured adapter instance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shared::types::{AdapterConfig, UsageMode};

/// Relative latency class, used for ordering defaults only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyClass {
    Fast,
    Medium,
    Slow,
}

/// One declared configuration field of an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub required: bool,
    pub default: Option<serde_json::Value>,
}

impl FieldSpec {
    pub fn required() -> Self {
        Self {
            required: true,
            default: None,
        }
    }

    pub fn optional(default: Option<serde_json::Value>) -> Self {
        Self {
            required: false,
            default,
        }
    }
}

/// Static capability metadata for one adapter. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    pub id: String,
    pub display_name: String,
    pub config_schema: HashMap<String, FieldSpec>,
    pub requires_network: bool,
    pub latency: LatencyClass,
    pub supports_streaming: bool,
}

impl AdapterDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            config_schema: HashMap::new(),
            requires_network: false,
            latency: LatencyClass::Medium,
            supports_streaming: false,
        }
    }

    pub fn network(mut self, requires_network: bool) -> Self {
        self.requires_network = requires_network;
        self
    }

    pub fn latency(mut self, latency: LatencyClass) -> Self {
        self.latency = latency;
        self
    }

    pub fn streaming(mut self, supports_streaming: bool) -> Self {
        self.supports_streaming = supports_streaming;
        self
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.config_schema.insert(name.into(), spec);
        self
    }

    /// Names of required fields missing (or empty) in `config`.
    pub fn missing_fields(&self, config: &AdapterConfig) -> Vec<&str> {
        self.config_schema
            .iter()
            .filter(|(name, spec)| {
                spec.required
                    && match config.get(name.as_str()) {
                        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
                        Some(serde_json::Value::Null) | None => true,
                        Some(_) => false,
                    }
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Merge declared defaults under the stored config (stored values win).
    pub fn apply_defaults(&self, config: &AdapterConfig) -> AdapterConfig {
        let mut merged: AdapterConfig = self
            .config_schema
            .iter()
            .filter_map(|(name, spec)| {
                spec.default.clone().map(|value| (name.clone(), value))
            })
            .collect();
        merged.extend(config.clone());
        merged
    }
}

pub type AdapterFactory<A> = Box<dyn Fn() -> A + Send + Sync>;

struct RegistryEntry<A> {
    descriptor: AdapterDescriptor,
    factory: AdapterFactory<A>,
}

/// Maps stable adapter ids to factories plus declared metadata.
pub struct CapabilityRegistry<A> {
    entries: HashMap<String, RegistryEntry<A>>,
    /// Default priority order for interactive use.
    default_interactive: Vec<String>,
    /// Default priority order for high-frequency streaming capture,
    /// biased toward low-latency adapters.
    default_streaming: Vec<String>,
}

impl<A> CapabilityRegistry<A> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            default_interactive: Vec::new(),
            default_streaming: Vec::new(),
        }
    }

    /// Register an adapter. Re-registering an existing id overwrites the
    /// previous entry with a warning; this is how test doubles and plugin
    /// overrides slot in, so it is not an error.
    pub fn register<F>(&mut self, descriptor: AdapterDescriptor, factory: F)
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        let id = descriptor.id.clone();
        if self.entries.contains_key(&id) {
            log::warn!("[Registry] Overwriting existing adapter registration: {}", id);
        }
        self.entries.insert(
            id,
            RegistryEntry {
                descriptor,
                factory: Box::new(factory),
            },
        );
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Build a fresh, unconfigured instance for `id`.
    pub fn create(&self, id: &str) -> Option<A> {
        self.entries.get(id).map(|entry| (entry.factory)())
    }

    pub fn descriptor(&self, id: &str) -> Option<&AdapterDescriptor> {
        self.entries.get(id).map(|entry| &entry.descriptor)
    }

    pub fn list_metadata(&self) -> Vec<AdapterDescriptor> {
        self.entries
            .values()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    pub fn set_default_priority(&mut self, mode: UsageMode, ids: Vec<String>) {
        match mode {
            UsageMode::Interactive => self.default_interactive = ids,
            UsageMode::Streaming => self.default_streaming = ids,
        }
    }

    pub fn default_priority(&self, mode: UsageMode) -> &[String] {
        match mode {
            UsageMode::Interactive => &self.default_interactive,
            UsageMode::Streaming => &self.default_streaming,
        }
    }
}

impl<A> Default for CapabilityRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str) -> AdapterDescriptor {
        AdapterDescriptor::new(id, id.to_uppercase())
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry: CapabilityRegistry<&'static str> = CapabilityRegistry::new();
        registry.register(descriptor("alpha"), || "alpha-instance");

        assert!(registry.has("alpha"));
        assert!(!registry.has("beta"));
        assert_eq!(registry.create("alpha"), Some("alpha-instance"));
        assert!(registry.create("beta").is_none());
        assert_eq!(registry.list_metadata().len(), 1);
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut registry: CapabilityRegistry<u32> = CapabilityRegistry::new();
        registry.register(descriptor("alpha"), || 1);
        registry.register(descriptor("alpha"), || 2);

        assert_eq!(registry.create("alpha"), Some(2));
        assert_eq!(registry.list_metadata().len(), 1);
    }

    #[test]
    fn test_missing_fields() {
        let desc = descriptor("cloud")
            .field("api_key", FieldSpec::required())
            .field("endpoint", FieldSpec::optional(Some(serde_json::json!("https://x"))));

        let mut config = AdapterConfig::new();
        assert_eq!(desc.missing_fields(&config), vec!["api_key"]);

        config.insert("api_key".to_string(), serde_json::json!("  "));
        assert_eq!(desc.missing_fields(&config), vec!["api_key"]);

        config.insert("api_key".to_string(), serde_json::json!("k"));
        assert!(desc.missing_fields(&config).is_empty());
    }

    #[test]
    fn test_apply_defaults_stored_wins() {
        let desc = descriptor("cloud")
            .field("endpoint", FieldSpec::optional(Some(serde_json::json!("https://default"))));

        let merged = desc.apply_defaults(&AdapterConfig::new());
        assert_eq!(merged["endpoint"], serde_json::json!("https://default"));

        let mut stored = AdapterConfig::new();
        stored.insert("endpoint".to_string(), serde_json::json!("https://mine"));
        let merged = desc.apply_defaults(&stored);
        assert_eq!(merged["endpoint"], serde_json::json!("https://mine"));
    }

    #[test]
    fn test_default_priority_per_mode() {
        let mut registry: CapabilityRegistry<u32> = CapabilityRegistry::new();
        registry.set_default_priority(
            UsageMode::Interactive,
            vec!["slow-good".to_string(), "fast-ok".to_string()],
        );
        registry.set_default_priority(
            UsageMode::Streaming,
            vec!["fast-ok".to_string(), "slow-good".to_string()],
        );

        assert_eq!(registry.default_priority(UsageMode::Interactive)[0], "slow-good");
        assert_eq!(registry.default_priority(UsageMode::Streaming)[0], "fast-ok");
    }
}
