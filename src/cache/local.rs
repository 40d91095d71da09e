//! Filesystem-backed cache service
//!
//! Stores each entry as a tar archive under `<root>/entries/` and keeps a
//! JSON index of keys, path-set versions and save times. Suitable for
//! self-hosted runners with a persistent cache directory.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   index.json
//!   entries/
//!     1.tar
//!     2.tar
//! ```

use crate::cache::key::cache_version;
use crate::cache::service::{CacheId, CacheService};
use crate::error::{FlatterError, FlatterResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

const INDEX_FILE: &str = "index.json";
const ENTRIES_DIR: &str = "entries";

/// One saved entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexEntry {
    id: CacheId,
    key: String,
    version: String,
    created_at: DateTime<Utc>,
}

impl IndexEntry {
    fn archive_name(&self) -> String {
        format!("{}.tar", self.id)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    next_id: CacheId,
    entries: Vec<IndexEntry>,
}

/// Cache service storing entries in a local directory
pub struct FsCacheService {
    root: PathBuf,
    workdir: PathBuf,
}

impl FsCacheService {
    /// Create a service storing entries under `root`, resolving cached
    /// relative paths against `workdir`
    pub fn new(root: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            workdir: workdir.into(),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    fn archive_path(&self, entry: &IndexEntry) -> PathBuf {
        self.root.join(ENTRIES_DIR).join(entry.archive_name())
    }

    async fn load_index(&self) -> FlatterResult<CacheIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(CacheIndex::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| FlatterError::io(format!("reading cache index {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| {
            FlatterError::CacheService(format!("corrupt index {}: {}", path.display(), e))
        })
    }

    async fn store_index(&self, index: &CacheIndex) -> FlatterResult<()> {
        let path = self.index_path();
        let tmp = self.root.join(format!("{}.tmp", INDEX_FILE));

        let content = serde_json::to_string_pretty(index)?;
        fs::write(&tmp, content)
            .await
            .map_err(|e| FlatterError::io(format!("writing cache index {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| FlatterError::io(format!("replacing cache index {}", path.display()), e))
    }

    async fn tar(&self, args: &[&str]) -> FlatterResult<()> {
        debug!("Executing: tar {:?}", args);

        let output = Command::new("tar")
            .args(args)
            .current_dir(&self.workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FlatterError::command_failed(format!("tar {:?}", args), e))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(FlatterError::tool_failed(
                format!("tar {}", args.join(" ")),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr),
            ))
        }
    }
}

/// Pick the entry to restore
///
/// An exact key wins. Otherwise the longest matching restore prefix wins,
/// equally long prefixes are tried in the given order, and within a prefix
/// the most recently saved entry wins.
fn select_entry<'a>(
    entries: &'a [IndexEntry],
    version: &str,
    key: &str,
    restore_keys: &[String],
) -> Option<&'a IndexEntry> {
    let newest = |predicate: &dyn Fn(&IndexEntry) -> bool| {
        entries
            .iter()
            .filter(|e| e.version == version && predicate(*e))
            .max_by_key(|e| (e.created_at, e.id))
    };

    if let Some(entry) = newest(&|e| e.key == key) {
        return Some(entry);
    }

    let mut prefixes: Vec<&str> = restore_keys.iter().map(String::as_str).collect();
    prefixes.sort_by_key(|prefix| std::cmp::Reverse(prefix.len()));

    prefixes
        .into_iter()
        .find_map(|prefix| newest(&|e| e.key.starts_with(prefix)))
}

#[async_trait]
impl CacheService for FsCacheService {
    fn is_available(&self) -> bool {
        !self.root.as_os_str().is_empty()
    }

    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &str,
        restore_keys: &[String],
    ) -> FlatterResult<Option<String>> {
        let index = self.load_index().await?;
        let version = cache_version(paths);

        let Some(entry) = select_entry(&index.entries, &version, key, restore_keys) else {
            debug!("No cache entry for {} in {}", key, self.root.display());
            return Ok(None);
        };

        let archive_path = self.archive_path(entry);
        let archive = archive_path.to_string_lossy();
        let workdir = self.workdir.to_string_lossy();
        self.tar(&[
            "--extract",
            "--absolute-names",
            "--file",
            &*archive,
            "--directory",
            &*workdir,
        ])
        .await?;

        Ok(Some(entry.key.clone()))
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> FlatterResult<Option<CacheId>> {
        for path in paths {
            if !self.workdir.join(path).exists() {
                return Err(FlatterError::CachePathMissing(path.clone()));
            }
        }

        let mut index = self.load_index().await?;
        let version = cache_version(paths);

        if index
            .entries
            .iter()
            .any(|e| e.key == key && e.version == version)
        {
            info!("Cache entry {} already exists, not saving", key);
            return Ok(None);
        }

        fs::create_dir_all(self.root.join(ENTRIES_DIR))
            .await
            .map_err(|e| FlatterError::io(format!("creating {}", self.root.display()), e))?;

        index.next_id += 1;
        let entry = IndexEntry {
            id: index.next_id,
            key: key.to_string(),
            version,
            created_at: Utc::now(),
        };

        let archive = self.archive_path(&entry);
        let archive_str = archive.to_string_lossy();
        let workdir = self.workdir.to_string_lossy();
        let mut args = vec![
            "--create",
            "--absolute-names",
            "--file",
            &*archive_str,
            "--directory",
            &*workdir,
        ];
        let path_args: Vec<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        args.extend(path_args.iter().map(String::as_str));

        if let Err(e) = self.tar(&args).await {
            let _ = fs::remove_file(&archive).await;
            return Err(e);
        }

        let id = entry.id;
        index.entries.push(entry);
        self.store_index(&index).await?;

        debug!("Saved cache entry {} as {}", key, archive.display());
        Ok(Some(id))
    }
}
