//! Flatter - Flatpak repositories built in CI
//!
//! Builds Flatpak manifests into a repository and publishes it, caching
//! flatpak-builder state per manifest and the repository across runs.

pub mod action;
pub mod artifact;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod flatpak;
pub mod orchestration;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FlatterError, FlatterResult};
