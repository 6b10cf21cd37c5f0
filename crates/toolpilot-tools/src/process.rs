//! Running external commands with a single fallback and classifying the outcome.
//!
//! A primary command that exits cleanly is a success, or a warning when it wrote to
//! stderr. When the primary cannot be started, exits non-zero or times out, the
//! alternate command is tried once. If that also fails the reported failure is the
//! primary's; the alternate's error is only logged and kept as metadata.

use crate::traits::ToolOutput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use toolpilot_core::Context;
use tracing::{debug, info};

/// A program and its argument vector. Never passed through a shell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {detail}", exit_code(.code))]
    Exit {
        command: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("`{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Failure,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Warning => "warning",
            Status::Failure => "failure",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of one tool step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub status: Status,
    pub message: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    /// The alternate command, when it was the one that produced this result.
    pub fallback: Option<CommandSpec>,
    pub fallback_error: Option<String>,
}

impl Invocation {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            stdout: None,
            stderr: None,
            fallback: None,
            fallback_error: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Status::Warning, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "unknown error".to_string()
        } else {
            message
        };
        Self::new(Status::Failure, message)
    }

    /// Classifies a command that exited cleanly by whether it wrote to stderr.
    pub fn from_output(output: CommandOutput) -> Self {
        let stdout = output.stdout.trim().to_string();
        let stderr = output.stderr.trim().to_string();

        let mut invocation = if stderr.is_empty() {
            Self::success(stdout.clone())
        } else {
            Self::warning(format!("stdout:\n{}\nstderr:\n{}", stdout, stderr))
        };
        invocation.stdout = Some(stdout);
        if !stderr.is_empty() {
            invocation.stderr = Some(stderr);
        }
        invocation
    }

    pub fn is_failure(&self) -> bool {
        self.status == Status::Failure
    }

    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Writes the outcome to the context's progress writer and hands it back.
    pub fn report(self, ctx: &Context) -> Self {
        ctx.progress(self.to_string());
        self
    }

    /// Renders the outcome for the model under a short subject line.
    pub fn render(&self, subject: &str) -> String {
        let mut text = match self.status {
            Status::Success if self.message.is_empty() => format!("✅ {}", subject),
            Status::Success => format!("✅ {}:\n{}", subject, self.message),
            Status::Warning => format!("⚠️ {} (with warnings):\n{}", subject, self.message),
            Status::Failure => format!("❌ {} failed: {}", subject, self.message),
        };
        if let Some(fallback) = &self.fallback {
            text.push_str(&format!("\n(used fallback command `{}`)", fallback));
        }
        text
    }

    pub fn into_output(self, subject: &str) -> ToolOutput {
        let content = self.render(subject);
        let mut output = if self.is_failure() {
            ToolOutput::error(content)
        } else {
            ToolOutput::text(content)
        };
        output = output.with_metadata("status", self.status);
        if let Some(fallback) = &self.fallback {
            output = output.with_metadata("fallback", fallback.to_string());
        }
        if let Some(err) = &self.fallback_error {
            output = output.with_metadata("fallback_error", err);
        }
        output
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = match (self.status, &self.stderr) {
            (Status::Warning, Some(stderr)) => stderr.as_str(),
            _ => self.message.as_str(),
        };
        let first_line = summary.lines().next().unwrap_or_default();
        write!(f, "[{}] {}", self.status, first_line)?;
        if let Some(fallback) = &self.fallback {
            write!(f, " (via `{}`)", fallback)?;
        }
        Ok(())
    }
}

/// Runs commands in a fixed working directory under a per-command timeout.
#[derive(Clone, Debug)]
pub struct FallbackExecutor {
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl FallbackExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn in_dir(&self, dir: impl AsRef<Path>) -> Self {
        self.clone().with_working_dir(dir.as_ref())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one command to completion. The child is killed when the timeout
    /// elapses or the context is cancelled.
    pub async fn run(
        &self,
        ctx: &Context,
        command: &CommandSpec,
    ) -> std::result::Result<CommandOutput, CommandError> {
        let shown = command.to_string();
        if ctx.is_cancelled() {
            return Err(CommandError::Cancelled { command: shown });
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let limit = ctx.bounded(self.timeout);
        debug!(command = %shown, timeout_ms = limit.as_millis() as u64, "Running command");

        let child = cmd.spawn().map_err(|source| CommandError::Spawn {
            command: shown.clone(),
            source,
        })?;

        let token = ctx.cancellation_token();
        let waited = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(CommandError::Cancelled { command: shown }),
            waited = tokio::time::timeout(limit, child.wait_with_output()) => waited,
        };

        let output = match waited {
            Err(_) => {
                return Err(CommandError::Timeout {
                    command: shown,
                    timeout_ms: limit.as_millis() as u64,
                })
            }
            Ok(Err(source)) => {
                return Err(CommandError::Spawn {
                    command: shown,
                    source,
                })
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or("no output")
                .to_string();
            Err(CommandError::Exit {
                command: shown,
                code: output.status.code(),
                detail,
            })
        }
    }

    /// Runs `primary`, falling back to `alternate` once if it fails.
    pub async fn execute(
        &self,
        ctx: &Context,
        primary: &CommandSpec,
        alternate: Option<&CommandSpec>,
    ) -> Invocation {
        let invocation = match self.run(ctx, primary).await {
            Ok(output) => Invocation::from_output(output),
            Err(err) if err.is_cancelled() => Invocation::failure(err.to_string()),
            Err(primary_err) => match alternate {
                None => {
                    info!(command = %primary, error = %primary_err, "Command failed");
                    Invocation::failure(primary_err.to_string())
                }
                Some(alt) => {
                    info!(command = %primary, fallback = %alt, error = %primary_err, "Command failed, trying fallback");
                    ctx.progress(format!("`{}` failed, trying `{}`", primary, alt));
                    self.run_alternate(ctx, alt, primary_err).await
                }
            },
        };
        invocation.report(ctx)
    }

    async fn run_alternate(
        &self,
        ctx: &Context,
        alt: &CommandSpec,
        primary_err: CommandError,
    ) -> Invocation {
        match self.run(ctx, alt).await {
            Ok(output) => {
                let mut invocation = Invocation::from_output(output);
                invocation.fallback = Some(alt.clone());
                invocation
            }
            Err(err) if err.is_cancelled() => Invocation::failure(err.to_string()),
            Err(alt_err) => {
                debug!(command = %alt, error = %alt_err, "Fallback command failed");
                let mut invocation = Invocation::failure(primary_err.to_string());
                invocation.fallback_error = Some(alt_err.to_string());
                invocation
            }
        }
    }
}
