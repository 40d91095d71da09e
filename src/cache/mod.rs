//! Incremental build and repository caching
//!
//! Provides content-addressed keys for flatpak-builder state and
//! time-ordered keys for the Flatpak repository, plus the restore/save
//! protocol that keeps both directories warm across CI runs.
//!
//! # Keys
//!
//! | Directory | Key | Restore prefix |
//! |-----------|-----|----------------|
//! | build state | `{base}-{arch}-{sha256(manifest)}` | `{base}-{arch}-` |
//! | repository | `{base}-{gpg?}-{timestamp}` | `{base}-{gpg?}-` |

pub mod continuity;
pub mod key;
mod local;
pub mod service;

pub use continuity::{Continuity, RestoreOutcome, SaveOutcome};
pub use key::{
    build_restore_prefix, checksum_file, derive_key, repository_key, repository_restore_prefix,
    BuildTarget, CacheKey,
};
pub use local::FsCacheService;
pub use service::{CacheId, CacheService};
