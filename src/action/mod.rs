//! CI platform surface
//!
//! Every phase receives an [`ActionContext`] instead of reading process
//! environment directly, so the whole pipeline runs against an in-memory
//! context in tests.
//!
//! The context covers the parts of the runner protocol flatter relies on:
//! named inputs, outputs, state carried from the `pre` phase to the `post`
//! phase, log groups, annotations and soft failure.

mod github;
mod record;

pub use github::GithubContext;
pub use record::{CacheRecord, CACHE_RECORD_STATE};

use crate::error::{FlatterError, FlatterResult};

/// Runner input/output surface
pub trait ActionContext: Send + Sync {
    /// Raw input value, `None` when the input was not supplied at all
    fn input(&self, name: &str) -> Option<String>;

    /// Write a named output for later workflow steps
    fn set_output(&self, name: &str, value: &str) -> FlatterResult<()>;

    /// State saved by an earlier phase of the same run
    fn state(&self, name: &str) -> Option<String>;

    /// Save state for a later phase of the same run
    fn set_state(&self, name: &str, value: &str) -> FlatterResult<()>;

    /// Begin a collapsible log group
    fn start_group(&self, title: &str);

    /// End the current log group
    fn end_group(&self);

    /// Emit a warning annotation
    fn warning(&self, message: &str);

    /// Emit an error annotation without failing the run
    fn error(&self, message: &str);

    /// Emit an error annotation and mark the run as failed. Execution continues.
    fn set_failed(&self, message: &str);

    /// Whether `set_failed` has been called
    fn is_failed(&self) -> bool;

    /// Input value with `default` used when the input was not supplied
    fn input_or(&self, name: &str, default: &str) -> String {
        self.input(name).unwrap_or_else(|| default.to_string())
    }

    /// Boolean input following the YAML 1.2 core schema
    /// (`true | True | TRUE | false | False | FALSE`)
    fn boolean_input(&self, name: &str) -> FlatterResult<Option<bool>> {
        let Some(value) = self.input(name) else {
            return Ok(None);
        };

        match value.as_str() {
            "" => Ok(None),
            "true" | "True" | "TRUE" => Ok(Some(true)),
            "false" | "False" | "FALSE" => Ok(Some(false)),
            _ => Err(FlatterError::InvalidInput {
                name: name.to_string(),
                reason: "expected `true` or `false`".to_string(),
            }),
        }
    }

    /// Input split on newlines, with blank lines dropped
    fn multiline_input(&self, name: &str) -> Vec<String> {
        self.input(name)
            .map(|value| split_lines(&value))
            .unwrap_or_default()
    }
}

fn split_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
