//! Per-target and per-run results

use crate::cache::{CacheKey, RestoreOutcome, SaveOutcome};
use crate::error::{FlatterError, FlatterResult};
use std::path::PathBuf;

/// What happened to one manifest
#[derive(Debug)]
pub struct TargetReport {
    pub manifest: PathBuf,
    /// Build-state key, `None` with caching disabled
    pub cache_key: Option<CacheKey>,
    pub restore: RestoreOutcome,
    pub save: SaveOutcome,
    pub build: FlatterResult<()>,
    /// Bundle file, when bundles were requested and the build succeeded
    pub bundle: Option<FlatterResult<PathBuf>>,
}

impl TargetReport {
    pub fn new(manifest: PathBuf) -> Self {
        Self {
            manifest,
            cache_key: None,
            restore: RestoreOutcome::Miss,
            save: SaveOutcome::Disabled,
            build: Ok(()),
            bundle: None,
        }
    }

    /// The target failed to build, or its bundle failed
    pub fn is_failed(&self) -> bool {
        self.build.is_err() || matches!(self.bundle, Some(Err(_)))
    }
}

/// Aggregate of a `main` phase
#[derive(Debug, Default)]
pub struct RunReport {
    pub targets: Vec<TargetReport>,
    /// Pages archive, when it was uploaded
    pub pages: Option<PathBuf>,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.targets.iter().filter(|t| t.is_failed()).count()
    }

    pub fn all_built(&self) -> bool {
        self.targets.iter().all(|t| t.build.is_ok())
    }

    /// Bundle files produced, in manifest order
    pub fn bundles(&self) -> Vec<&PathBuf> {
        self.targets
            .iter()
            .filter_map(|t| t.bundle.as_ref())
            .filter_map(|b| b.as_ref().ok())
            .collect()
    }

    /// `Err(TargetsFailed)` when any target failed
    pub fn into_result(self) -> FlatterResult<Self> {
        match self.failed() {
            0 => Ok(self),
            failed => Err(FlatterError::TargetsFailed {
                failed,
                total: self.targets.len(),
            }),
        }
    }
}
