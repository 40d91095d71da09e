//! Configuration management for flatter
//!
//! Configuration comes from one of two places: the action inputs of the
//! current workflow step, or a TOML file given with `--config` (or
//! `FLATTER_CONFIG`) for running outside GitHub Actions.

pub mod schema;

pub use schema::{Config, MetadataConfig};

use crate::action::ActionContext;
use crate::error::{FlatterError, FlatterResult};
use schema::DEFAULT_CACHE_KEY;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration file loader
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Load the configuration file. Unlike action inputs, a missing file is
    /// an error: it was asked for explicitly.
    pub async fn load(&self) -> FlatterResult<Config> {
        if !self.config_path.exists() {
            return Err(FlatterError::ConfigNotFound(self.config_path.clone()));
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> FlatterResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FlatterError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| FlatterError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Config {
    /// Build the configuration from the action inputs of the current step
    pub fn from_context(ctx: &dyn ActionContext) -> FlatterResult<Self> {
        let defaults = Config::default();

        let manifests: Vec<PathBuf> = ctx
            .multiline_input("manifests")
            .into_iter()
            .map(PathBuf::from)
            .collect();
        if manifests.is_empty() {
            return Err(FlatterError::MissingInput("manifests".to_string()));
        }

        let text = |name: &str| ctx.input(name).filter(|v| !v.is_empty());
        let path_or = |name: &str, default: PathBuf| text(name).map(PathBuf::from).unwrap_or(default);

        Ok(Self {
            manifests,
            repo: path_or("repo", defaults.repo),
            arch: text("arch").unwrap_or(defaults.arch),
            cache_key: ctx.input_or("cache-key", DEFAULT_CACHE_KEY),
            gpg_sign: text("gpg-sign"),
            gpg_homedir: text("gpg-homedir").map(PathBuf::from),
            default_branch: text("default-branch"),
            flatpak_builder_args: ctx.multiline_input("flatpak-builder-args"),
            flatpak_build_bundle_args: ctx.multiline_input("flatpak-build-bundle-args"),
            upload_pages_artifact: ctx
                .boolean_input("upload-pages-artifact")?
                .unwrap_or(defaults.upload_pages_artifact),
            upload_bundles: ctx
                .boolean_input("upload-bundles")?
                .unwrap_or(defaults.upload_bundles),
            build_dir: path_or("build-dir", defaults.build_dir),
            state_dir: path_or("state-dir", defaults.state_dir),
            cache_dir: path_or("cache-dir", defaults.cache_dir),
            artifact_dir: path_or("artifact-dir", defaults.artifact_dir),
            metadata: MetadataConfig {
                title: text("repo-title"),
                description: text("repo-description"),
                url: text("repo-url"),
                homepage: text("repo-homepage"),
                icon: text("repo-icon"),
            },
        })
    }

    /// Render as TOML
    pub fn to_toml(&self) -> FlatterResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
