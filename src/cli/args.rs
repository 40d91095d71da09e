//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Flatter - build Flatpak repositories in CI
///
/// Builds Flatpak manifests into a repository, keeping flatpak-builder
/// state and the repository itself cached between runs.
#[derive(Parser, Debug)]
#[command(name = "flatter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file used instead of action inputs
    #[arg(short, long, global = true, env = "FLATTER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore the repository from cache
    Pre,

    /// Build all manifests, update the repository and publish artifacts
    Main,

    /// Save the repository to cache
    Post,

    /// Run pre, main and post in one process
    Run,

    /// Print the build-state cache key of a manifest
    Key(KeyArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the key command
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Flatpak manifest (.json, .yaml or .yml)
    pub manifest: PathBuf,

    /// Target architecture (defaults to the host architecture)
    #[arg(short, long)]
    pub arch: Option<String>,

    /// Base cache key; empty disables caching
    #[arg(short, long, default_value = "flatter")]
    pub base_key: String,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved configuration as TOML
    Show,

    /// Show the configuration file in use
    Path,
}
