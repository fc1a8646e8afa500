//! Utilities for running external client tools with timeouts and cancellation

use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::runtime::runtime;

/// Default timeout for a single tool invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("'{program}' not found in PATH")]
    NotFound { program: String },

    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with exit code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("{program} was cancelled")]
    Cancelled { program: String },
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled { .. })
    }

    /// Combined output of a failed invocation, for diagnostics
    pub fn output_text(&self) -> Option<String> {
        match self {
            CommandError::Failed { stdout, stderr, .. } => Some(format!("{}\n{}", stdout, stderr)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Arg {
    value: String,
    secret: bool,
}

/// A fully described tool invocation
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<Arg>,
    env: Vec<(String, String)>,
    timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            secret: false,
        });
        self
    }

    /// Add an argument that must never appear in logs
    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            secret: true,
        });
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.value.as_str()).collect()
    }

    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.secret {
                write!(f, " ****")?;
            } else {
                write!(f, " {}", arg.value)?;
            }
        }
        Ok(())
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run a command, killing it on timeout or cancellation
pub fn run_command(spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput, CommandError> {
    let program = spec.program().to_string();

    if cancel.is_cancelled() {
        return Err(CommandError::Cancelled { program });
    }

    let mut cmd = tokio::process::Command::new(&program);
    cmd.args(spec.args())
        .envs(spec.env_vars().iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running command: {}", spec);

    let rt = runtime().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;

    let timeout = spec.get_timeout();
    let output = rt.block_on(async {
        tokio::select! {
            result = tokio::time::timeout(timeout, cmd.output()) => match result {
                Ok(output) => output.map_err(|source| CommandError::Spawn {
                    program: program.clone(),
                    source,
                }),
                Err(_) => Err(CommandError::TimedOut {
                    program: program.clone(),
                    timeout,
                }),
            },
            _ = cancel.cancelled() => Err(CommandError::Cancelled {
                program: program.clone(),
            }),
        }
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        error!("Command failed: {}", spec);
        error!("Stderr: {}", stderr.trim());
        return Err(CommandError::Failed {
            program,
            code: output.status.code(),
            stdout,
            stderr,
        });
    }

    if !stdout.is_empty() {
        debug!("Command output: {}", stdout.trim());
    }

    Ok(CommandOutput { stdout, stderr })
}
