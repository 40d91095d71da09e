//! External tool execution
//!
//! Every `flatpak`, `flatpak-builder`, `gpg2` and `tar` invocation made by the
//! pipeline goes through [`ToolRunner`], so tests can record and fail calls
//! without the tools installed.

use crate::error::{FlatterError, FlatterResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Max number of output lines to include in tool error messages.
const ERROR_TAIL_LINES: usize = 50;

/// Runs external command-line tools
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args`, streaming its output to the log.
    /// A non-zero exit is an error.
    async fn run(&self, program: &str, args: &[String]) -> FlatterResult<()>;

    /// Run `program` with `args` and capture stdout.
    /// A non-zero exit is an error.
    async fn output(&self, program: &str, args: &[String]) -> FlatterResult<String>;
}

/// Runs tools as child processes of flatter
pub struct SystemRunner {
    workdir: Option<PathBuf>,
}

impl SystemRunner {
    /// Create a runner using the current directory
    pub fn new() -> Self {
        Self { workdir: None }
    }

    /// Create a runner executing tools in `workdir`
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(workdir.into()),
        }
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> FlatterResult<()> {
        let cmdline = command_line(program, args);
        debug!("Executing: {}", cmdline);

        let mut child = self
            .command(program, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FlatterError::command_failed(&cmdline, e))?;

        let lines = stream_child_output(&mut child, &|line| println!("{}", line)).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| FlatterError::command_failed(&cmdline, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(FlatterError::tool_failed(
                cmdline,
                status.code(),
                error_tail(&lines),
            ))
        }
    }

    async fn output(&self, program: &str, args: &[String]) -> FlatterResult<String> {
        let cmdline = command_line(program, args);
        debug!("Executing: {}", cmdline);

        let output = self
            .command(program, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| FlatterError::command_failed(&cmdline, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<String> = stderr.lines().map(str::to_string).collect();
            Err(FlatterError::tool_failed(
                cmdline,
                output.status.code(),
                error_tail(&lines),
            ))
        }
    }
}

/// Render a command line for logs and error messages
fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the useful tail of tool output for error diagnostics.
fn error_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns all collected output lines for error reporting.
async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> FlatterResult<Vec<String>> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| FlatterError::Internal("child stderr not piped".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| FlatterError::Internal("child stdout not piped".to_string()))?;

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    Ok(all_output)
}
