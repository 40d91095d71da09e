//! GitHub Actions runner protocol
//!
//! Inputs arrive as `INPUT_<NAME>` environment variables, state saved by an
//! earlier phase as `STATE_<name>`. New state and outputs are appended to the
//! files named by `GITHUB_STATE` and `GITHUB_OUTPUT` using heredoc
//! delimiters. Annotations and groups are workflow commands on stdout.

use crate::action::ActionContext;
use crate::error::{FlatterError, FlatterResult};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Context backed by the GitHub Actions runner environment
pub struct GithubContext {
    state_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    /// State set during this process, visible to later phases of `flatter run`
    overlay: Mutex<HashMap<String, String>>,
    failed: AtomicBool,
}

impl GithubContext {
    /// Create a context from the current process environment
    pub fn from_env() -> Self {
        Self::with_files(
            std::env::var_os("GITHUB_STATE").map(PathBuf::from),
            std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
        )
    }

    /// Create a context writing state and outputs to explicit files
    pub fn with_files(state_file: Option<PathBuf>, output_file: Option<PathBuf>) -> Self {
        Self {
            state_file,
            output_file,
            overlay: Mutex::new(HashMap::new()),
            failed: AtomicBool::new(false),
        }
    }

    /// Whether the process is running under GitHub Actions
    pub fn is_github_actions() -> bool {
        std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
    }

    fn input_var(name: &str) -> String {
        format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
    }

    fn issue(command: &str, message: &str) {
        println!("{}", workflow_command(command, message));
    }
}

impl ActionContext for GithubContext {
    fn input(&self, name: &str) -> Option<String> {
        std::env::var(Self::input_var(name))
            .ok()
            .map(|value| value.trim().to_string())
    }

    fn set_output(&self, name: &str, value: &str) -> FlatterResult<()> {
        match &self.output_file {
            Some(path) => append_file_command(path, name, value),
            None => {
                debug!("No output file, dropping output {}={}", name, value);
                Ok(())
            }
        }
    }

    fn state(&self, name: &str) -> Option<String> {
        if let Ok(overlay) = self.overlay.lock() {
            if let Some(value) = overlay.get(name) {
                return Some(value.clone());
            }
        }

        std::env::var(format!("STATE_{}", name))
            .ok()
            .filter(|value| !value.is_empty())
    }

    fn set_state(&self, name: &str, value: &str) -> FlatterResult<()> {
        self.overlay
            .lock()
            .map_err(|e| FlatterError::StatePersist {
                name: name.to_string(),
                reason: e.to_string(),
            })?
            .insert(name.to_string(), value.to_string());

        match &self.state_file {
            Some(path) => append_file_command(path, name, value),
            None => Ok(()),
        }
    }

    fn start_group(&self, title: &str) {
        println!("{}", workflow_command("group", title));
    }

    fn end_group(&self) {
        println!("::endgroup::");
    }

    fn warning(&self, message: &str) {
        Self::issue("warning", message);
    }

    fn error(&self, message: &str) {
        Self::issue("error", message);
    }

    fn set_failed(&self, message: &str) {
        self.failed.store(true, Ordering::SeqCst);
        Self::issue("error", message);
    }

    fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// `::command::message` line with the message escaped
fn workflow_command(command: &str, message: &str) -> String {
    format!("::{}::{}", command, escape_data(message))
}

/// Escape a workflow command payload
fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Append `name<<delimiter` heredoc to a runner file command
fn append_file_command(path: &Path, name: &str, value: &str) -> FlatterResult<()> {
    let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());

    if name.contains(&delimiter) || value.contains(&delimiter) {
        return Err(FlatterError::StatePersist {
            name: name.to_string(),
            reason: "value contains the heredoc delimiter".to_string(),
        });
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FlatterError::io(format!("opening {}", path.display()), e))?;

    writeln!(file, "{}<<{}\n{}\n{}", name, delimiter, value, delimiter)
        .map_err(|e| FlatterError::io(format!("writing {}", path.display()), e))
}
