//! Command execution abstraction for testability
//!
//! This module provides a trait-based abstraction for command execution,
//! enabling dependency injection and mocking for tests.

use super::command::Invocation;
use anyhow::Result;
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command with optional timeout; nonzero exit is an error
    async fn run_command(&self, invocation: &Invocation, timeout: Option<Duration>)
        -> Result<Output>;
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
    async fn run_command(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<Output> {
        super::command::run_command(invocation, timeout).await
    }
}

/// Scripted executor for dump tools, shared with the test crate
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Output file flags understood by the dump tools
    const OUTPUT_FLAGS: [&str; 2] = ["--file=", "--result-file="];

    /// What a scripted program does when invoked
    #[derive(Clone, Debug, Default)]
    pub enum MockResponse {
        /// Exit zero without touching the filesystem
        #[default]
        Success,
        /// Exit zero after writing `contents` to the invocation's output file
        Dump { contents: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
    }

    #[derive(Clone, Default)]
    pub struct MockExecutor {
        calls: Arc<Mutex<Vec<Invocation>>>,
        /// program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        fallback: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the response of one program
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Response for programs without a scripted one
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.fallback.lock().unwrap() = response;
            self
        }

        /// Every invocation seen so far, in call order
        pub fn get_calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn was_called(&self, program: &str) -> bool {
            self.call_count(program) > 0
        }

        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .count()
        }

        fn response_for(&self, program: &str) -> MockResponse {
            self.responses
                .lock()
                .unwrap()
                .get(program)
                .cloned()
                .unwrap_or_else(|| self.fallback.lock().unwrap().clone())
        }
    }

    /// The file a dump invocation writes to, if it names one
    pub fn output_file(invocation: &Invocation) -> Option<PathBuf> {
        invocation.args.iter().find_map(|arg| {
            OUTPUT_FLAGS
                .iter()
                .find_map(|flag| arg.strip_prefix(flag))
                .map(PathBuf::from)
        })
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn run_command(
            &self,
            invocation: &Invocation,
            _timeout: Option<Duration>,
        ) -> Result<Output> {
            self.calls.lock().unwrap().push(invocation.clone());

            match self.response_for(&invocation.program) {
                MockResponse::Success => {}
                MockResponse::Dump { contents } => {
                    let Some(path) = output_file(invocation) else {
                        anyhow::bail!("{} was called without an output file", invocation.program);
                    };
                    std::fs::write(&path, contents)?;
                }
                MockResponse::Failure { stderr, exit_code } => {
                    anyhow::bail!("Command failed with exit code {:?}: {}", exit_code, stderr)
                }
                MockResponse::Timeout => anyhow::bail!("Command timed out"),
            }

            Ok(Output {
                status: std::process::ExitStatus::default(),
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        }
    }
}
