//! Single-file bundles exported from the repository

use crate::config::Config;
use crate::error::FlatterResult;
use crate::flatpak::manifest::Manifest;
use crate::flatpak::runner::ToolRunner;
use std::path::PathBuf;
use tracing::info;

/// A bundle to export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSpec {
    /// Application ID
    pub app_id: String,
    /// Branch to export
    pub branch: String,
}

impl BundleSpec {
    /// Resolve app ID and branch from a manifest
    pub fn from_manifest(manifest: &Manifest, config: &Config) -> FlatterResult<Self> {
        Ok(Self {
            app_id: manifest.app_id()?.to_string(),
            branch: manifest
                .branch(config.default_branch.as_deref())
                .to_string(),
        })
    }

    /// Bundle file name (`<app-id>.flatpak`)
    pub fn file_name(&self) -> String {
        format!("{}.flatpak", self.app_id)
    }

    /// Artifact name, unique per app and architecture
    pub fn artifact_name(&self, arch: &str) -> String {
        format!("{}-{}", self.app_id, arch)
    }
}

/// Assemble the `flatpak build-bundle` command line
pub fn bundle_args(config: &Config, spec: &BundleSpec, file: &str) -> Vec<String> {
    let mut args = vec![
        "build-bundle".to_string(),
        format!("--arch={}", config.arch),
    ];
    args.extend(config.flatpak_build_bundle_args.iter().cloned());
    args.extend(config.gpg_args());
    args.push(config.repo.display().to_string());
    args.push(file.to_string());
    args.push(spec.app_id.clone());
    args.push(spec.branch.clone());
    args
}

/// Export `spec` from the repository to `<workspace>/<app-id>.flatpak`
pub async fn build_bundle(
    tools: &dyn ToolRunner,
    config: &Config,
    spec: &BundleSpec,
) -> FlatterResult<PathBuf> {
    info!("Building bundle {} ({})", spec.app_id, spec.branch);

    let file = spec.file_name();
    tools.run("flatpak", &bundle_args(config, spec, &file)).await?;
    Ok(PathBuf::from(file))
}
