//! Flatpak manifest loading
//!
//! Only the keys flatter needs are extracted; the rest of the manifest is
//! left for flatpak-builder to interpret.

use crate::error::{FlatterError, FlatterResult};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Branch used when neither the manifest nor the configuration names one
pub const DEFAULT_BRANCH: &str = "master";

/// Manifest serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
}

impl ManifestFormat {
    /// Detect the format of `path`
    pub fn from_path(path: &Path) -> FlatterResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(FlatterError::UnsupportedManifestFormat(path.to_path_buf())),
        }
    }
}

/// A parsed Flatpak manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    document: Value,
}

impl Manifest {
    /// Load a manifest from disk. The extension is checked before the file
    /// is read.
    pub async fn load(path: &Path) -> FlatterResult<Self> {
        let format = ManifestFormat::from_path(path)?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| FlatterError::io(format!("reading manifest {}", path.display()), e))?;

        Self::parse(path, format, &data)
    }

    /// Parse manifest bytes in the given format
    pub fn parse(path: &Path, format: ManifestFormat, data: &[u8]) -> FlatterResult<Self> {
        let parse_error = |reason: String| FlatterError::ManifestParse {
            path: path.to_path_buf(),
            reason,
        };

        let document: Value = match format {
            ManifestFormat::Json => {
                serde_json::from_slice(data).map_err(|e| parse_error(e.to_string()))?
            }
            ManifestFormat::Yaml => {
                serde_yaml::from_slice(data).map_err(|e| parse_error(e.to_string()))?
            }
        };

        if !document.is_object() {
            return Err(parse_error("top level is not a mapping".to_string()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    fn string(&self, key: &str) -> Option<&str> {
        self.document
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Application ID (`app-id`, or the older `id`)
    pub fn app_id(&self) -> FlatterResult<&str> {
        self.string("app-id")
            .or_else(|| self.string("id"))
            .ok_or_else(|| FlatterError::ManifestMissingId(self.path.clone()))
    }

    /// Branch a bundle should be exported from
    ///
    /// The manifest's `branch` wins, then the configured default branch
    /// (which flatpak-builder was told to use), then the manifest's
    /// `default-branch`, then `master`.
    pub fn branch<'a>(&'a self, configured_default: Option<&'a str>) -> &'a str {
        self.string("branch")
            .or(configured_default.filter(|b| !b.is_empty()))
            .or_else(|| self.string("default-branch"))
            .unwrap_or(DEFAULT_BRANCH)
    }
}
