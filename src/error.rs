//! Error types for flatter
//!
//! All modules use `FlatterResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for flatter operations
pub type FlatterResult<T> = Result<T, FlatterError>;

/// All errors that can occur in flatter
#[derive(Error, Debug)]
pub enum FlatterError {
    // Input errors
    #[error("Input required and not supplied: {0}")]
    MissingInput(String),

    #[error("Invalid input {name}: {reason}")]
    InvalidInput { name: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // Manifest errors
    #[error("Unsupported manifest format: {0}")]
    UnsupportedManifestFormat(PathBuf),

    #[error("Failed to parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("Manifest {0} has no app-id or id")]
    ManifestMissingId(PathBuf),

    // Tool errors
    #[error("{command} {status}\n{output}")]
    ToolFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("Failed to export GPG key {key}: {reason}")]
    KeyExport { key: String, reason: String },

    // Cache errors
    #[error("Cache service error: {0}")]
    CacheService(String),

    #[error("Cache path validation failed: {0}")]
    CachePathMissing(PathBuf),

    // Artifact errors
    #[error("Artifact already uploaded in this run: {0}")]
    ArtifactExists(String),

    #[error("Invalid artifact name: {0}")]
    ArtifactName(String),

    // Run errors
    #[error("{failed} of {total} build target(s) failed")]
    TargetsFailed { failed: usize, total: usize },

    #[error("Failed to persist action state {name}: {reason}")]
    StatePersist { name: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlatterError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error (the process could not be spawned)
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a tool failure from a non-zero exit status
    pub fn tool_failed(command: impl Into<String>, code: Option<i32>, output: impl Into<String>) -> Self {
        let status = match code {
            Some(code) => format!("exited with code {}", code),
            None => "was terminated by a signal".to_string(),
        };
        Self::ToolFailed {
            command: command.into(),
            status,
            output: output.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingInput(_) => Some("Set the input in the workflow `with:` block"),
            Self::UnsupportedManifestFormat(_) => {
                Some("Manifests must end in .json, .yaml or .yml")
            }
            Self::ManifestMissingId(_) => Some("Add an `app-id` (or `id`) key to the manifest"),
            Self::KeyExport { .. } => {
                Some("Import the signing key first, e.g. with crazy-max/ghaction-import-gpg")
            }
            Self::ConfigNotFound(_) => Some("Check the --config path (or FLATTER_CONFIG)"),
            _ => None,
        }
    }
}
