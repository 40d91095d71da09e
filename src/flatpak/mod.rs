//! Thin wrappers over the Flatpak toolchain
//!
//! - `flatpak-builder` builds manifests into the repository
//! - `flatpak build-update-repo` refreshes (and signs) the summary
//! - `flatpak build-bundle` exports single-file bundles
//! - `gpg2 --armor --export` provides the key for `.flatpakrepo`

pub mod builder;
pub mod bundle;
pub mod manifest;
pub mod repo;
mod runner;

pub use bundle::BundleSpec;
pub use manifest::{Manifest, ManifestFormat};
pub use repo::{FlatpakRepoFile, FLATPAKREPO_FILE};
pub use runner::{SystemRunner, ToolRunner};
