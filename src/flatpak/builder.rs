//! flatpak-builder invocation

use crate::config::Config;
use crate::error::FlatterResult;
use crate::flatpak::runner::ToolRunner;
use std::path::Path;
use tracing::info;

/// Options flatter always passes to flatpak-builder
const BASE_OPTIONS: &[&str] = &["--ccache", "--disable-rofiles-fuse", "--force-clean"];

/// Assemble the flatpak-builder command line for `manifest`, keeping its
/// build state in `state_dir`
///
/// Options derived from the configuration come first, then the user's extra
/// arguments with duplicates removed, then the build directory and manifest.
pub fn builder_args(config: &Config, manifest: &Path, state_dir: &Path) -> Vec<String> {
    let mut args = vec![format!("--arch={}", config.arch)];
    args.extend(BASE_OPTIONS.iter().map(|s| s.to_string()));
    args.push(format!("--repo={}", config.repo.display()));
    args.push(format!("--state-dir={}", state_dir.display()));

    if let Some(branch) = config.default_branch.as_deref().filter(|b| !b.is_empty()) {
        args.push(format!("--default-branch={}", branch));
    }
    args.extend(config.gpg_args());

    for extra in &config.flatpak_builder_args {
        if !args.contains(extra) {
            args.push(extra.clone());
        }
    }

    args.push(config.build_dir.display().to_string());
    args.push(manifest.display().to_string());
    args
}

/// Build `manifest` and export it into the configured repository
pub async fn build(
    tools: &dyn ToolRunner,
    config: &Config,
    manifest: &Path,
    state_dir: &Path,
) -> FlatterResult<()> {
    info!("Building {} for {}", manifest.display(), config.arch);
    tools
        .run("flatpak-builder", &builder_args(config, manifest, state_dir))
        .await
}
