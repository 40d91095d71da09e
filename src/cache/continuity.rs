//! Restore/save protocol around a unit of work
//!
//! Restoring fills a working directory with the most relevant saved state
//! before work begins; saving persists the new state afterwards. Neither
//! step can fail the run: service errors are downgraded to warnings and a
//! failed restore behaves like a miss.
//!
//! # Restore Outcomes
//!
//! | Outcome | Meaning | Save afterwards |
//! |---------|---------|-----------------|
//! | ExactHit | entry under the requested key | skipped |
//! | FallbackHit | older entry matched by prefix | yes |
//! | Miss | nothing restored | yes |

use crate::action::ActionContext;
use crate::cache::key::CacheKey;
use crate::cache::service::{CacheId, CacheService};
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of a restore attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The service returned exactly the requested key
    ExactHit(String),
    /// A restore prefix matched an older entry
    FallbackHit(String),
    /// Nothing was restored
    Miss,
}

impl RestoreOutcome {
    /// Classify the key the service returned against the requested key.
    ///
    /// Keys are compared with plain string equality.
    pub fn classify(requested: &str, matched: Option<&str>) -> Self {
        match matched {
            Some(key) if key == requested => Self::ExactHit(key.to_string()),
            Some(key) => Self::FallbackHit(key.to_string()),
            None => Self::Miss,
        }
    }

    /// Whether the requested key itself was restored
    pub fn is_exact_hit(&self) -> bool {
        matches!(self, Self::ExactHit(_))
    }

    /// Key of the restored entry
    pub fn matched_key(&self) -> Option<&str> {
        match self {
            Self::ExactHit(key) | Self::FallbackHit(key) => Some(key),
            Self::Miss => None,
        }
    }
}

/// Result of a save attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Caching is disabled
    Disabled,
    /// The exact key was restored, nothing to persist
    Skipped,
    /// Saved with the service's entry id
    Saved(CacheId),
    /// The service declined to save (key already reserved)
    Declined,
    /// The service failed; reported as a warning
    Failed,
}

/// Restore/save coordinator bound to one cache service
pub struct Continuity<'a> {
    service: &'a dyn CacheService,
    ctx: &'a dyn ActionContext,
    enabled: bool,
}

impl<'a> Continuity<'a> {
    /// Create a coordinator. An empty `base_key` or an unavailable service
    /// turns every operation into a no-op.
    pub fn new(service: &'a dyn CacheService, ctx: &'a dyn ActionContext, base_key: &str) -> Self {
        let enabled = !base_key.is_empty() && service.is_available();
        Self {
            service,
            ctx,
            enabled,
        }
    }

    /// Whether restores and saves reach the service
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Restore `paths` under `key`, falling back to `fallback_prefixes`
    pub async fn restore(
        &self,
        paths: &[PathBuf],
        key: &CacheKey,
        fallback_prefixes: &[String],
    ) -> RestoreOutcome {
        if !self.enabled {
            debug!("Cache disabled, not restoring {}", key);
            return RestoreOutcome::Miss;
        }

        match self
            .service
            .restore(paths, key.as_str(), fallback_prefixes)
            .await
        {
            Ok(matched) => {
                let outcome = RestoreOutcome::classify(key.as_str(), matched.as_deref());
                match &outcome {
                    RestoreOutcome::ExactHit(k) => info!("Cache restored from key: {}", k),
                    RestoreOutcome::FallbackHit(k) => {
                        info!("Cache restored from fallback key: {} (wanted {})", k, key)
                    }
                    RestoreOutcome::Miss => info!(
                        "Cache not found for input keys: {}",
                        std::iter::once(key.as_str())
                            .chain(fallback_prefixes.iter().map(String::as_str))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }
                outcome
            }
            Err(e) => {
                self.ctx
                    .warning(&format!("Failed to restore cache {}: {}", key, e));
                RestoreOutcome::Miss
            }
        }
    }

    /// Save `paths` under `key` unless `last` already restored exactly `key`
    pub async fn save(&self, paths: &[PathBuf], key: &CacheKey, last: &RestoreOutcome) -> SaveOutcome {
        if !self.enabled {
            debug!("Cache disabled, not saving {}", key);
            return SaveOutcome::Disabled;
        }

        if let RestoreOutcome::ExactHit(matched) = last {
            if matched == key.as_str() {
                info!("Cache hit occurred on key {}, not saving", key);
                return SaveOutcome::Skipped;
            }
        }

        match self.service.save(paths, key.as_str()).await {
            Ok(Some(id)) => {
                info!("Cache saved with key: {}", key);
                SaveOutcome::Saved(id)
            }
            Ok(None) => {
                info!("Cache not saved, key {} is already reserved", key);
                SaveOutcome::Declined
            }
            Err(e) => {
                self.ctx
                    .warning(&format!("Failed to save cache {}: {}", key, e));
                SaveOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingCache, MemoryCache, MemoryContext};

    fn paths() -> Vec<PathBuf> {
        vec![PathBuf::from(".flatpak-builder")]
    }

    #[test]
    fn classify_outcomes() {
        assert_eq!(
            RestoreOutcome::classify("flatter-x86_64-abc123", Some("flatter-x86_64-abc123")),
            RestoreOutcome::ExactHit("flatter-x86_64-abc123".to_string())
        );
        assert_eq!(
            RestoreOutcome::classify("flatter-x86_64-abc123", Some("flatter-x86_64-old")),
            RestoreOutcome::FallbackHit("flatter-x86_64-old".to_string())
        );
        assert_eq!(RestoreOutcome::classify("k", None), RestoreOutcome::Miss);
    }

    #[tokio::test]
    async fn exact_hit_suppresses_save() {
        let cache = MemoryCache::new().with_entry("flatter-x86_64-abc123");
        let ctx = MemoryContext::new();
        let continuity = Continuity::new(&cache, &ctx, "flatter");
        let key = CacheKey::from("flatter-x86_64-abc123");

        let outcome = continuity.restore(&paths(), &key, &[]).await;
        assert!(outcome.is_exact_hit());

        let saved = continuity.save(&paths(), &key, &outcome).await;
        assert_eq!(saved, SaveOutcome::Skipped);
        assert!(cache.saved_keys().is_empty());
    }

    #[tokio::test]
    async fn fallback_hit_saves() {
        let cache = MemoryCache::new().with_entry("flatter-x86_64-old");
        let ctx = MemoryContext::new();
        let continuity = Continuity::new(&cache, &ctx, "flatter");
        let key = CacheKey::from("flatter-x86_64-new");

        let outcome = continuity
            .restore(&paths(), &key, &["flatter-x86_64-".to_string()])
            .await;
        assert_eq!(outcome, RestoreOutcome::FallbackHit("flatter-x86_64-old".into()));

        let saved = continuity.save(&paths(), &key, &outcome).await;
        assert!(matches!(saved, SaveOutcome::Saved(_)));
        assert_eq!(cache.saved_keys(), vec!["flatter-x86_64-new"]);
    }

    #[tokio::test]
    async fn miss_saves() {
        let cache = MemoryCache::new();
        let ctx = MemoryContext::new();
        let continuity = Continuity::new(&cache, &ctx, "flatter");
        let key = CacheKey::from("flatter-x86_64-abc123");

        let outcome = continuity.restore(&paths(), &key, &[]).await;
        assert_eq!(outcome, RestoreOutcome::Miss);
        assert!(matches!(
            continuity.save(&paths(), &key, &outcome).await,
            SaveOutcome::Saved(_)
        ));
    }

    #[tokio::test]
    async fn exact_hit_for_other_key_still_saves() {
        let cache = MemoryCache::new();
        let ctx = MemoryContext::new();
        let continuity = Continuity::new(&cache, &ctx, "flatter");

        let last = RestoreOutcome::ExactHit("flatter-x86_64-other".into());
        let key = CacheKey::from("flatter-x86_64-abc123");
        assert!(matches!(
            continuity.save(&paths(), &key, &last).await,
            SaveOutcome::Saved(_)
        ));
    }

    #[tokio::test]
    async fn outage_is_a_warning() {
        let cache = FailingCache;
        let ctx = MemoryContext::new();
        let continuity = Continuity::new(&cache, &ctx, "flatter");
        let key = CacheKey::from("flatter-x86_64-abc123");

        let outcome = continuity.restore(&paths(), &key, &[]).await;
        assert_eq!(outcome, RestoreOutcome::Miss);
        assert_eq!(continuity.save(&paths(), &key, &outcome).await, SaveOutcome::Failed);

        assert_eq!(ctx.warnings().len(), 2);
        assert!(!ctx.is_failed());
    }

    #[tokio::test]
    async fn empty_base_key_disables() {
        let cache = MemoryCache::new().with_entry("k");
        let ctx = MemoryContext::new();
        let continuity = Continuity::new(&cache, &ctx, "");
        let key = CacheKey::from("k");

        assert!(!continuity.is_enabled());
        assert_eq!(continuity.restore(&paths(), &key, &[]).await, RestoreOutcome::Miss);
        assert_eq!(
            continuity.save(&paths(), &key, &RestoreOutcome::Miss).await,
            SaveOutcome::Disabled
        );
        assert_eq!(cache.restore_calls(), 0);
    }

    #[tokio::test]
    async fn unavailable_service_disables() {
        let cache = MemoryCache::new().unavailable();
        let ctx = MemoryContext::new();
        let continuity = Continuity::new(&cache, &ctx, "flatter");

        assert!(!continuity.is_enabled());
    }
}
