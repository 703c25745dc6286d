//! Priority- and privacy-aware candidate selection.

use crate::core::registry::CapabilityRegistry;
use crate::shared::types::{PrivacyMode, UsageMode};

/// The privacy collaborator, queried once per pipeline run before adapter
/// selection.
pub trait PrivacyPolicy: Send + Sync {
    fn mode(&self) -> PrivacyMode;
}

/// Fixed-mode policy, handy for embedding and tests.
pub struct StaticPrivacy(pub PrivacyMode);

impl PrivacyPolicy for StaticPrivacy {
    fn mode(&self) -> PrivacyMode {
        self.0
    }
}

/// Build the ordered candidate list for one operation.
///
/// A non-empty `override_list` fully replaces the registry default for
/// `usage_mode`; there is no merging. Network-requiring adapters are dropped
/// under offline/strict privacy. Ids with unmet required configuration stay
/// in the list; the fallback executor skips them at call time, so the result
/// may legitimately contain currently-unusable ids.
pub fn candidates<A>(
    registry: &CapabilityRegistry<A>,
    override_list: &[String],
    privacy: PrivacyMode,
    usage_mode: UsageMode,
) -> Vec<String> {
    let base: Vec<String> = if !override_list.is_empty() {
        override_list.to_vec()
    } else {
        registry.default_priority(usage_mode).to_vec()
    };

    base.into_iter()
        .filter(|id| match registry.descriptor(id) {
            Some(descriptor) => {
                let allowed = privacy.allows_network() || !descriptor.requires_network;
                if !allowed {
                    log::debug!(
                        "[Selector] Excluding network adapter {} under privacy mode {:?}",
                        id,
                        privacy
                    );
                }
                allowed
            }
            // Unregistered ids cannot be instantiated anyway; the fallback
            // executor reports them as unavailable.
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::AdapterDescriptor;

    fn registry() -> CapabilityRegistry<u8> {
        let mut registry = CapabilityRegistry::new();
        registry.register(AdapterDescriptor::new("cloud", "Cloud").network(true), || 0);
        registry.register(AdapterDescriptor::new("local", "Local").network(false), || 1);
        registry.set_default_priority(
            UsageMode::Interactive,
            vec!["cloud".to_string(), "local".to_string()],
        );
        registry.set_default_priority(
            UsageMode::Streaming,
            vec!["local".to_string(), "cloud".to_string()],
        );
        registry
    }

    #[test]
    fn test_default_order_per_mode() {
        let registry = registry();
        let interactive = candidates(&registry, &[], PrivacyMode::Standard, UsageMode::Interactive);
        assert_eq!(interactive, vec!["cloud", "local"]);

        let streaming = candidates(&registry, &[], PrivacyMode::Standard, UsageMode::Streaming);
        assert_eq!(streaming, vec!["local", "cloud"]);
    }

    #[test]
    fn test_override_replaces_default() {
        let registry = registry();
        let ordered = candidates(
            &registry,
            &["local".to_string()],
            PrivacyMode::Standard,
            UsageMode::Interactive,
        );
        assert_eq!(ordered, vec!["local"]);
    }

    #[test]
    fn test_privacy_excludes_network_adapters() {
        let registry = registry();
        for mode in [PrivacyMode::Offline, PrivacyMode::Strict] {
            let ordered = candidates(
                &registry,
                &["cloud".to_string(), "local".to_string()],
                mode,
                UsageMode::Interactive,
            );
            assert_eq!(ordered, vec!["local"], "mode {:?}", mode);
        }
    }

    #[test]
    fn test_secure_mode_keeps_network_adapters() {
        let registry = registry();
        let ordered = candidates(&registry, &[], PrivacyMode::Secure, UsageMode::Interactive);
        assert_eq!(ordered, vec!["cloud", "local"]);
    }

    #[test]
    fn test_unregistered_id_passes_through() {
        let registry = registry();
        let ordered = candidates(
            &registry,
            &["ghost".to_string(), "local".to_string()],
            PrivacyMode::Offline,
            UsageMode::Interactive,
        );
        assert_eq!(ordered, vec!["ghost", "local"]);
    }
}
