//! Configuration schema for flatter
//!
//! Field names match the action input names, so a `flatter.toml` reads like
//! the `with:` block of a workflow step:
//!
//! ```toml
//! manifests = ["org.example.App.yml"]
//! repo = "repo"
//! arch = "x86_64"
//! gpg-sign = "ABCD1234"
//! upload-pages-artifact = true
//!
//! [metadata]
//! title = "Example Apps"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default base cache key
pub const DEFAULT_CACHE_KEY: &str = "flatter";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Manifests to build, in order
    pub manifests: Vec<PathBuf>,

    /// Flatpak repository directory
    pub repo: PathBuf,

    /// Target architecture
    pub arch: String,

    /// Base cache key; empty disables caching
    pub cache_key: String,

    /// GPG key ID to sign the repository and bundles with
    pub gpg_sign: Option<String>,

    /// GPG home directory holding the signing key
    pub gpg_homedir: Option<PathBuf>,

    /// Branch passed to flatpak-builder and used for bundles
    pub default_branch: Option<String>,

    /// Extra flatpak-builder arguments
    pub flatpak_builder_args: Vec<String>,

    /// Extra `flatpak build-bundle` arguments
    pub flatpak_build_bundle_args: Vec<String>,

    /// Publish the repository as a GitHub Pages artifact
    pub upload_pages_artifact: bool,

    /// Publish a bundle artifact per manifest
    pub upload_bundles: bool,

    /// flatpak-builder build directory
    pub build_dir: PathBuf,

    /// Root of the flatpak-builder state directories, one per manifest and arch
    pub state_dir: PathBuf,

    /// Cache service storage directory
    pub cache_dir: PathBuf,

    /// Artifact service storage directory
    pub artifact_dir: PathBuf,

    /// `.flatpakrepo` overrides
    pub metadata: MetadataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifests: vec![],
            repo: PathBuf::from("repo"),
            arch: std::env::consts::ARCH.to_string(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            gpg_sign: None,
            gpg_homedir: None,
            default_branch: None,
            flatpak_builder_args: vec![],
            flatpak_build_bundle_args: vec![],
            upload_pages_artifact: false,
            upload_bundles: false,
            build_dir: PathBuf::from("_build"),
            state_dir: PathBuf::from(".flatpak-builder"),
            cache_dir: default_cache_dir(),
            artifact_dir: PathBuf::from("artifacts"),
            metadata: MetadataConfig::default(),
        }
    }
}

impl Config {
    /// Signing key, if one is configured
    pub fn gpg_key(&self) -> Option<&str> {
        self.gpg_sign.as_deref().filter(|k| !k.is_empty())
    }

    /// `--gpg-sign`/`--gpg-homedir` options shared by the flatpak tools
    pub fn gpg_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(key) = self.gpg_key() {
            args.push(format!("--gpg-sign={}", key));
            if let Some(homedir) = &self.gpg_homedir {
                args.push(format!("--gpg-homedir={}", homedir.display()));
            }
        }
        args
    }
}

/// `.flatpakrepo` fields; unset fields come from the GitHub event payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub homepage: Option<String>,
    pub icon: Option<String>,
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("flatter")
}
