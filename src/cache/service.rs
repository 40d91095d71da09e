//! Cache service abstraction
//!
//! The cache service is a remote key-value store of directory snapshots.
//! flatter only consumes its contract; [`FsCacheService`](super::FsCacheService)
//! is the bundled implementation.

use crate::error::FlatterResult;
use async_trait::async_trait;
use std::path::PathBuf;

/// Identifier the service assigns to a saved entry
pub type CacheId = u64;

/// Key-value store of directory snapshots
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Whether the service can be used in this environment
    fn is_available(&self) -> bool;

    /// Restore `paths` from the entry saved under `key`, or else from the
    /// newest entry whose key starts with one of `restore_keys`.
    ///
    /// Returns the key of the restored entry, `None` on a miss.
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &str,
        restore_keys: &[String],
    ) -> FlatterResult<Option<String>>;

    /// Save `paths` under `key`.
    ///
    /// Returns `None` when the service declined to save, e.g. because the key
    /// is already taken.
    async fn save(&self, paths: &[PathBuf], key: &str) -> FlatterResult<Option<CacheId>>;
}
