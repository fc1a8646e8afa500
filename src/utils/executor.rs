//! Command execution abstraction for testability
//!
//! Database connectors run their engine's client tools through this trait,
//! so tests can substitute a recording mock for real subprocesses.

use super::command::{CommandError, CommandOutput, CommandSpec};
use tokio_util::sync::CancellationToken;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command, honouring its timeout and the cancellation token
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput, CommandError>;

    /// Check whether a program can be found in PATH
    fn program_exists(&self, program: &str) -> bool;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput, CommandError> {
        if !self.program_exists(spec.program()) {
            return Err(CommandError::NotFound {
                program: spec.program().to_string(),
            });
        }
        super::command::run_command(spec, cancel)
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub env: Vec<(String, String)>,
    }

    impl CommandCall {
        /// Check whether any argument contains the given text
        pub fn has_arg(&self, needle: &str) -> bool {
            self.args.iter().any(|a| a.contains(needle))
        }
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
        Cancelled,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Programs reported as missing from PATH
        missing: Arc<Mutex<HashSet<String>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Report a program as not installed
        pub fn without_program(self, program: &str) -> Self {
            self.missing.lock().unwrap().insert(program.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Get the recorded calls to a specific program
        pub fn calls_to(&self, program: &str) -> Vec<CommandCall> {
            self.get_calls()
                .into_iter()
                .filter(|c| c.program == program)
                .collect()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.program == program)
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn record_call(&self, spec: &CommandSpec) {
            self.calls.lock().unwrap().push(CommandCall {
                program: spec.program().to_string(),
                args: spec.args().iter().map(|s| s.to_string()).collect(),
                env: spec.env_vars().to_vec(),
            });
        }

        fn get_response(&self, program: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .get(program)
                .cloned()
                .unwrap_or_default()
        }
    }

    impl CommandExecutor for MockExecutor {
        fn run(&self, spec: &CommandSpec, cancel: &CancellationToken) -> Result<CommandOutput, CommandError> {
            self.record_call(spec);
            let program = spec.program().to_string();

            if cancel.is_cancelled() {
                return Err(CommandError::Cancelled { program });
            }

            match self.get_response(&program) {
                MockResponse::Success { stdout, stderr } => Ok(CommandOutput { stdout, stderr }),
                MockResponse::Failure { stderr, exit_code } => Err(CommandError::Failed {
                    program,
                    code: Some(exit_code),
                    stdout: String::new(),
                    stderr,
                }),
                MockResponse::Timeout => Err(CommandError::TimedOut {
                    program,
                    timeout: spec.get_timeout(),
                }),
                MockResponse::Cancelled => Err(CommandError::Cancelled { program }),
            }
        }

        fn program_exists(&self, program: &str) -> bool {
            !self.missing.lock().unwrap().contains(program)
        }
    }
}
