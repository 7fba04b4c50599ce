//! Subprocess execution with captured output.

use std::process::Command;

use crate::error::UtilError;

/// Captured result of a command execution.
#[derive(Debug)]
pub struct CommandOutput {
    /// The rendered command line, for error reporting.
    pub command: String,
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Combined stdout + stderr, trimmed.
    pub fn output(&self) -> String {
        let mut combined = String::new();
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined.trim().to_owned()
    }
}

/// Render a command as a single line for logs and error messages.
pub fn command_line(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    for arg in cmd.get_args() {
        parts.push(arg.to_string_lossy().into_owned());
    }
    parts.join(" ")
}

/// Execute a command and capture its output.
///
/// A non-zero exit code is **not** an error; check [`CommandOutput::success`]
/// instead.
///
/// # Errors
/// Returns an error if the command cannot be spawned (e.g. binary not found).
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    let rendered = command_line(cmd);
    log::debug!("running `{rendered}`");
    let output = cmd.output().map_err(|source| UtilError::CommandExec {
        command: rendered.clone(),
        source,
    })?;

    Ok(CommandOutput {
        command: rendered,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}
