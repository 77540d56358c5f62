//! Process executor port
//!
//! The executor receives a final, validated argv and environment. It never
//! builds or re-parses a shell command line; a shell runs only when the
//! configured command itself is one.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::tool::CallContext;

/// A fully resolved process launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// The complete child environment; the host environment is not inherited.
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    /// Bytes written to stdin before it is closed.
    pub stdin: Option<Vec<u8>>,
    /// Per-stream capture limit; excess output is drained and dropped.
    pub max_output_bytes: usize,
    pub timeout: Option<Duration>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(input);
        self
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub truncated: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn duration_ms(&self) -> u64 {
        u64::try_from((self.finished_at - self.started_at).num_milliseconds()).unwrap_or(0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("command not found: {0}")]
    NotFound(String),

    #[error("failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("process timed out after {0:?}")]
    TimedOut(Duration),

    #[error("process was cancelled")]
    Cancelled,
}

#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run to completion. On timeout or cancellation the child is killed
    /// before this returns.
    async fn run(&self, ctx: &CallContext, spec: ProcessSpec)
    -> Result<ProcessOutput, ProcessError>;
}
