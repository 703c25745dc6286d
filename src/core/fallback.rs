//! Fallback execution across an ordered candidate chain.
//!
//! This is the single retry/fallback mechanism in the system. Candidates are
//! attempted at most once per run, in order, with no backoff; an adapter
//! failure is contained here and never escapes as anything other than part
//! of the aggregate failure.

use std::future::Future;

use crate::core::instances::{InstanceCache, ManagedAdapter};
use crate::core::registry::CapabilityRegistry;
use crate::shared::error::AppError;

/// A successful chain run, annotated with the winning adapter id.
#[derive(Debug, Clone)]
pub struct ChainWin<T> {
    pub winner: String,
    pub value: T,
}

/// Aggregate failure after the candidate list is exhausted.
#[derive(Debug, Clone)]
pub struct ChainFailure {
    /// Every candidate actually invoked, with its individual error.
    /// Unconfigured candidates are skipped and do not appear here.
    pub attempts: Vec<(String, AppError)>,
}

impl ChainFailure {
    /// True when at least one engine ran and reported an empty result
    /// (nothing to recognize) rather than a real failure.
    pub fn any_empty_result(&self) -> bool {
        self.attempts
            .iter()
            .any(|(_, err)| matches!(err, AppError::EmptyRecognition))
    }

    /// Collapse per-candidate errors into one error of the caller's kind.
    pub fn into_error(self, wrap: fn(String) -> AppError) -> AppError {
        if self.attempts.is_empty() {
            return wrap("No eligible backend is configured".to_string());
        }
        let detail = self
            .attempts
            .iter()
            .map(|(id, err)| format!("{}: {}", id, err.user_message()))
            .collect::<Vec<_>>()
            .join("; ");
        wrap(format!("All backends failed ({})", detail))
    }
}

/// Walk `candidates` in order, invoking `op` on each ready adapter instance.
///
/// Adapters whose readiness check fails are skipped without counting as an
/// attempt. The first `Ok` wins immediately; an `Err` from `op` is recorded
/// and the walk advances. Exhaustion yields the aggregate failure.
pub async fn run_chain<A, T, F, Fut>(
    candidates: &[String],
    registry: &CapabilityRegistry<A>,
    cache: &InstanceCache<A>,
    mut op: F,
) -> Result<ChainWin<T>, ChainFailure>
where
    A: ManagedAdapter,
    F: FnMut(&str, A) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempts: Vec<(String, AppError)> = Vec::new();

    for id in candidates {
        let Some(instance) = cache.get_or_create(id, registry) else {
            continue;
        };
        if !instance.is_ready() {
            log::debug!("[Fallback] Skipping unconfigured adapter: {}", id);
            continue;
        }

        match op(id, instance).await {
            Ok(value) => {
                log::info!("[Fallback] {} succeeded after {} failed attempts", id, attempts.len());
                return Ok(ChainWin {
                    winner: id.clone(),
                    value,
                });
            }
            Err(err) => {
                log::warn!("[Fallback] {} failed: {}", id, err);
                attempts.push((id.clone(), err));
            }
        }
    }

    Err(ChainFailure { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::AdapterDescriptor;
    use crate::shared::types::AdapterConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct FakeAdapter {
        ready: bool,
    }

    impl ManagedAdapter for FakeAdapter {
        fn apply_config(&self, _config: &AdapterConfig) {}
        fn is_ready(&self) -> bool {
            self.ready
        }
    }

    fn registry(ids: &[(&str, bool)]) -> CapabilityRegistry<FakeAdapter> {
        let mut registry = CapabilityRegistry::new();
        for (id, ready) in ids {
            let ready = *ready;
            registry.register(AdapterDescriptor::new(*id, *id), move || FakeAdapter { ready });
        }
        registry
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_success_wins_and_each_attempted_once() {
        let registry = registry(&[("a", true), ("b", true), ("c", true)]);
        let cache = InstanceCache::new();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_op = calls.clone();
        let result = run_chain(&ids(&["a", "b", "c"]), &registry, &cache, move |id, _| {
            let calls = calls_op.clone();
            let id = id.to_string();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if id == "c" {
                    Ok(id)
                } else {
                    Err(AppError::Translation(format!("{} down", id)))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.winner, "c");
        assert_eq!(result.value, "c");
        // a and b each attempted exactly once before c won
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unready_candidates_are_skipped() {
        let registry = registry(&[("locked", false), ("open", true)]);
        let cache = InstanceCache::new();

        let result = run_chain(&ids(&["locked", "open"]), &registry, &cache, |id, _| {
            let id = id.to_string();
            async move { Ok::<_, AppError>(id) }
        })
        .await
        .unwrap();

        assert_eq!(result.winner, "open");
    }

    #[tokio::test]
    async fn test_exhaustion_aggregates_tried_ids() {
        let registry = registry(&[("a", true), ("b", true)]);
        let cache = InstanceCache::new();

        let failure = run_chain(&ids(&["a", "b", "ghost"]), &registry, &cache, |id, _| {
            let id = id.to_string();
            async move { Err::<(), _>(AppError::Network(format!("{} timeout", id))) }
        })
        .await
        .unwrap_err();

        assert_eq!(failure.attempts.len(), 2);
        let message = failure.into_error(AppError::Translation).to_string();
        assert!(message.contains("a:"));
        assert!(message.contains("b:"));
        assert!(!message.contains("ghost"));
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let registry = registry(&[]);
        let cache = InstanceCache::new();

        let failure = run_chain(&[], &registry, &cache, |_, _: FakeAdapter| async move {
            Ok::<(), _>(())
        })
        .await
        .unwrap_err();

        assert!(failure.attempts.is_empty());
        let message = failure.into_error(AppError::Recognition).to_string();
        assert!(message.contains("No eligible backend"));
    }

    #[tokio::test]
    async fn test_empty_result_detection() {
        let registry = registry(&[("ocr", true)]);
        let cache = InstanceCache::new();

        let failure = run_chain(&ids(&["ocr"]), &registry, &cache, |_, _| async move {
            Err::<(), _>(AppError::EmptyRecognition)
        })
        .await
        .unwrap_err();

        assert!(failure.any_empty_result());
    }
}
