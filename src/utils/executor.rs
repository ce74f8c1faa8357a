//! Command execution abstraction for testability
//!
//! Every external tool (mysqlsh, zip, unzip, docker, apt-get) is reached
//! through [`CommandExecutor`], so the orchestration logic can be exercised
//! with a recording fake instead of real processes.

use super::command::{CommandError, CommandOutput};
use async_trait::async_trait;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command with optional timeout; a non-zero exit is an error
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError>;

    /// Run a command and return stdout as string
    async fn run_stdout(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, CommandError> {
        Ok(self.run(program, args, timeout).await?.stdout)
    }
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for RealExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, CommandError> {
        super::command::run_command(program, args, timeout).await
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
    }

    impl CommandCall {
        /// Whether any argument contains `needle`
        pub fn mentions(&self, needle: &str) -> bool {
            self.args.iter().any(|a| a.contains(needle))
        }
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
        /// Never completes; used to exercise cancellation
        Hang,
    }

    impl MockResponse {
        pub fn stdout(text: &str) -> Self {
            MockResponse::Success {
                stdout: text.to_string(),
                stderr: String::new(),
            }
        }

        pub fn exit(code: i32, stderr: &str) -> Self {
            MockResponse::Failure {
                stderr: stderr.to_string(),
                exit_code: code,
            }
        }
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    #[derive(Clone, Debug)]
    struct Rule {
        program: String,
        needle: Option<String>,
        response: MockResponse,
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Configured responses, most specific first
        rules: Arc<Mutex<Vec<Rule>>>,
        /// Default response when no rule matches
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.rules.lock().unwrap().push(Rule {
                program: program.to_string(),
                needle: None,
                response,
            });
            self
        }

        /// Configure a response for calls to `program` whose arguments contain `needle`.
        ///
        /// These rules win over plain [`MockExecutor::expect`] rules.
        pub fn expect_with_arg(self, program: &str, needle: &str, response: MockResponse) -> Self {
            self.rules.lock().unwrap().push(Rule {
                program: program.to_string(),
                needle: Some(needle.to_string()),
                response,
            });
            self
        }

        /// Set the default response for unconfigured programs
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Get recorded calls to one program
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

        fn record_call(&self, program: &str, args: &[String]) {
            self.calls.lock().unwrap().push(CommandCall {
                program: program.to_string(),
                args: args.to_vec(),
            });
        }

        fn get_response(&self, program: &str, args: &[String]) -> MockResponse {
            let rules = self.rules.lock().unwrap();
            let targeted = rules.iter().find(|r| {
                r.program == program
                    && r.needle
                        .as_deref()
                        .is_some_and(|n| args.iter().any(|a| a.contains(n)))
            });
            let general = || {
                rules
                    .iter()
                    .find(|r| r.program == program && r.needle.is_none())
            };

            targeted
                .or_else(general)
                .map(|r| r.response.clone())
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            timeout: Option<Duration>,
        ) -> Result<CommandOutput, CommandError> {
            self.record_call(program, args);
            match self.get_response(program, args) {
                MockResponse::Success { stdout, stderr } => Ok(CommandOutput { stdout, stderr }),
                MockResponse::Failure { stderr, exit_code } => Err(CommandError::Failed {
                    program: program.to_string(),
                    code: Some(exit_code),
                    output: stderr,
                }),
                MockResponse::Timeout => Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout: timeout.unwrap_or_default(),
                }),
                MockResponse::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }
}
