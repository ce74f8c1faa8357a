//! Utilities for running commands with proper error handling and timeouts

use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, error};

/// Captured output of a finished external process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr, the way a terminal would show them
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} failed with exit code {code:?}, output: {output}")]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },
}

/// Longest slice of tool output carried inside an error
const MAX_ERROR_OUTPUT: usize = 2000;

/// Run a command with optional timeout.
///
/// The child is killed when the returned future is dropped, so racing this
/// against a cancellation token terminates the process.
pub async fn run_command(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CommandOutput, CommandError> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running command: {} {}", program, redact_args(args).join(" "));

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
            Ok(output) => output,
            Err(_) => {
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout: limit,
                })
            }
        },
        None => cmd.output().await,
    }
    .map_err(|source| CommandError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let captured = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if !output.status.success() {
        error!("Command failed: {} {}", program, redact_args(args).join(" "));
        return Err(CommandError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            output: truncate(&captured.combined(), MAX_ERROR_OUTPUT),
        });
    }

    if !captured.stdout.is_empty() {
        debug!("Command output: {}", captured.stdout.trim_end());
    }

    Ok(captured)
}

/// Mask secrets before a command line reaches the logs
pub fn redact_args(args: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;

    for arg in args {
        if mask_next {
            redacted.push("****".to_string());
            mask_next = false;
        } else if arg == "-P" {
            redacted.push(arg.clone());
            mask_next = true;
        } else if let Some((flag, _)) = arg.split_once('=').filter(|(f, _)| f.ends_with("password")) {
            redacted.push(format!("{}=****", flag));
        } else {
            redacted.push(arg.clone());
        }
    }

    redacted
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
