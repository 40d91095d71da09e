//! Build artifact publishing
//!
//! Artifacts are named file sets uploaded once per run. The GitHub Pages
//! artifact is the whole repository as a single `artifact.tar`; bundles are
//! one `<app-id>-<arch>` artifact per manifest.

use crate::config::Config;
use crate::error::{FlatterError, FlatterResult};
use crate::flatpak::ToolRunner;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Name GitHub Pages deployments look for
pub const PAGES_ARTIFACT: &str = "github-pages";

/// File name of the repository archive
pub const PAGES_ARCHIVE: &str = "artifact.tar";

/// Characters the artifact service rejects in names
const INVALID_NAME_CHARS: &[char] = &['"', ':', '<', '>', '|', '*', '?', '\r', '\n', '\\', '/'];

/// A completed upload
#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    pub id: Uuid,
    pub name: String,
    /// Total bytes uploaded
    pub size: u64,
}

/// Artifact storage
#[async_trait]
pub trait ArtifactService: Send + Sync {
    /// Upload `files` as artifact `name`, stored relative to `root_dir`
    async fn upload(
        &self,
        name: &str,
        files: &[PathBuf],
        root_dir: &Path,
    ) -> FlatterResult<ArtifactUpload>;
}

/// Check an artifact name against the characters the service rejects
pub fn validate_name(name: &str) -> FlatterResult<()> {
    if name.is_empty() || name.contains(INVALID_NAME_CHARS) {
        return Err(FlatterError::ArtifactName(name.to_string()));
    }
    Ok(())
}

/// Artifact service copying uploads into a local directory
pub struct LocalArtifactService {
    root: PathBuf,
}

impl LocalArtifactService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactService for LocalArtifactService {
    async fn upload(
        &self,
        name: &str,
        files: &[PathBuf],
        root_dir: &Path,
    ) -> FlatterResult<ArtifactUpload> {
        validate_name(name)?;

        let target = self.root.join(name);
        if target.exists() {
            return Err(FlatterError::ArtifactExists(name.to_string()));
        }

        let mut size = 0;
        for file in files {
            let relative = file.strip_prefix(root_dir).unwrap_or(file);
            let dest = target.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    FlatterError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }

            size += fs::copy(file, &dest).await.map_err(|e| {
                FlatterError::io(format!("copying {} to {}", file.display(), dest.display()), e)
            })?;
            debug!("Stored {} in artifact {}", relative.display(), name);
        }

        info!("Uploaded artifact {} ({} bytes)", name, size);
        Ok(ArtifactUpload {
            id: Uuid::new_v4(),
            name: name.to_string(),
            size,
        })
    }
}

/// Archive the repository for GitHub Pages, returning the archive path
pub async fn archive_repository(tools: &dyn ToolRunner, config: &Config) -> FlatterResult<PathBuf> {
    info!("Archiving {} for GitHub Pages", config.repo.display());

    let args: Vec<String> = [
        "--dereference",
        "--hard-dereference",
        "--directory",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([
        config.repo.display().to_string(),
        "-cf".to_string(),
        PAGES_ARCHIVE.to_string(),
        "--exclude=.git".to_string(),
        "--exclude=.github".to_string(),
        ".".to_string(),
    ])
    .collect();

    tools.run("tar", &args).await?;
    Ok(PathBuf::from(PAGES_ARCHIVE))
}
