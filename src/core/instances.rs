//! Lazily constructed, memoized adapter instances.
//!
//! One live instance exists per adapter id. Configuration updates are pushed
//! into live instances rather than recreating them; `clear()` forces lazy
//! recreation with the current configuration on next access.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::registry::CapabilityRegistry;
use crate::shared::types::AdapterConfig;

/// The subset of adapter behavior the cache needs, independent of whether
/// the adapter is a translation provider or an OCR engine. Implemented for
/// `Arc<dyn TranslationProvider>` and `Arc<dyn OcrEngine>`.
pub trait ManagedAdapter: Clone {
    fn apply_config(&self, config: &AdapterConfig);
    /// Whether the adapter can be invoked right now (required configuration
    /// present, local runtime reachable, ...).
    fn is_ready(&self) -> bool;
}

pub struct InstanceCache<A> {
    instances: Mutex<HashMap<String, A>>,
    configs: Mutex<HashMap<String, AdapterConfig>>,
}

impl<A: ManagedAdapter> InstanceCache<A> {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            configs: Mutex::new(HashMap::new()),
        }
    }

    /// Get the live instance for `id`, creating and configuring it on first
    /// use. Unknown ids log and return `None`; callers treat that as
    /// "unavailable", never as a hard error.
    pub fn get_or_create(&self, id: &str, registry: &CapabilityRegistry<A>) -> Option<A> {
        if let Some(existing) = lock_recover(&self.instances).get(id) {
            return Some(existing.clone());
        }

        let Some(instance) = registry.create(id) else {
            log::warn!("[InstanceCache] Unknown adapter id: {}", id);
            return None;
        };

        let stored = lock_recover(&self.configs)
            .get(id)
            .cloned()
            .unwrap_or_default();
        let merged = match registry.descriptor(id) {
            Some(descriptor) => descriptor.apply_defaults(&stored),
            None => stored,
        };
        instance.apply_config(&merged);

        lock_recover(&self.instances).insert(id.to_string(), instance.clone());
        log::debug!("[InstanceCache] Created instance for {}", id);
        Some(instance)
    }

    /// Shallow-merge `fields` into the stored configuration for `id` and
    /// push the merged result into the live instance, if any. Other ids are
    /// untouched.
    pub fn update_config(
        &self,
        id: &str,
        fields: AdapterConfig,
        registry: &CapabilityRegistry<A>,
    ) {
        let merged = {
            let mut configs = lock_recover(&self.configs);
            let entry = configs.entry(id.to_string()).or_default();
            entry.extend(fields);
            entry.clone()
        };

        if let Some(instance) = lock_recover(&self.instances).get(id) {
            let full = match registry.descriptor(id) {
                Some(descriptor) => descriptor.apply_defaults(&merged),
                None => merged,
            };
            instance.apply_config(&full);
            log::debug!("[InstanceCache] Pushed config update into live instance {}", id);
        }
    }

    pub fn stored_config(&self, id: &str) -> Option<AdapterConfig> {
        lock_recover(&self.configs).get(id).cloned()
    }

    /// Drop every live instance. Stored configuration is kept; instances are
    /// lazily recreated with it on next access.
    pub fn clear(&self) {
        let mut instances = lock_recover(&self.instances);
        let count = instances.len();
        instances.clear();
        log::debug!("[InstanceCache] Cleared {} instances", count);
    }
}

impl<A: ManagedAdapter> Default for InstanceCache<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_recover<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("[InstanceCache] Mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
