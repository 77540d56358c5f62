//! Tokio-based process executor.
//!
//! Spawns the validated argv directly (no shell), with a cleared environment,
//! bounded capture of stdout/stderr drained concurrently with `wait()`, and
//! the child killed on timeout or cancellation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use toolgate_application::ports::process_executor::{
    ProcessError, ProcessExecutor, ProcessOutput, ProcessSpec,
};
use toolgate_application::ports::tool::CallContext;
use tracing::{debug, info, warn};

/// Default per-stream capture limit (1 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct TokioProcessExecutor {
    default_timeout: Option<Duration>,
}

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline applied when neither the `ProcessSpec` nor the call context sets one.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Resolve `program` against the child's own `PATH`.
    fn resolve_program(spec: &ProcessSpec) -> Result<PathBuf, ProcessError> {
        if spec.program.contains(std::path::MAIN_SEPARATOR) || spec.program.contains('/') {
            return Ok(PathBuf::from(&spec.program));
        }
        let path: Option<OsString> = spec
            .env
            .iter()
            .find(|(k, _)| k == "PATH")
            .map(|(_, v)| OsString::from(v))
            .or_else(|| std::env::var_os("PATH"));
        let cwd = spec
            .working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        which::which_in(&spec.program, path, cwd)
            .map_err(|_| ProcessError::NotFound(spec.program.clone()))
    }
}

/// Read up to `max` bytes, then drain the rest so the child never blocks on
/// a full pipe. Returns the captured bytes and whether anything was dropped.
async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, max: usize) -> (Vec<u8>, bool) {
    let Some(mut reader) = reader else {
        return (Vec::new(), false);
    };
    let mut buf = Vec::new();
    let limit = u64::try_from(max).unwrap_or(u64::MAX);
    if let Err(e) = (&mut reader).take(limit).read_to_end(&mut buf).await {
        debug!(error = %e, "Failed reading child output");
    }
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink())
        .await
        .unwrap_or(0);
    (buf, dropped > 0)
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn run(
        &self,
        ctx: &CallContext,
        spec: ProcessSpec,
    ) -> Result<ProcessOutput, ProcessError> {
        if ctx.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }
        let program = Self::resolve_program(&spec)?;
        let timeout = [spec.timeout, ctx.remaining(), self.default_timeout]
            .into_iter()
            .flatten()
            .min();
        let max_output = if spec.max_output_bytes == 0 {
            DEFAULT_MAX_OUTPUT_BYTES
        } else {
            spec.max_output_bytes
        };

        let mut cmd = Command::new(&program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let started_at = Utc::now();
        let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
            program: spec.program.clone(),
            reason: e.to_string(),
        })?;
        info!(program = %spec.program, args = spec.args.len(), pid = ?child.id(), "Spawned process");

        let stdin_handle = child.stdin.take();
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let input = spec.stdin;

        let run = async {
            let stdin_fut = async {
                if let (Some(mut pipe), Some(bytes)) = (stdin_handle, input) {
                    // A child that exits without reading stdin is not an error.
                    if let Err(e) = pipe.write_all(&bytes).await {
                        debug!(error = %e, "Child closed stdin early");
                    }
                }
            };
            let (_, (stdout, out_cut), (stderr, err_cut), status) = tokio::join!(
                stdin_fut,
                drain(stdout_handle, max_output),
                drain(stderr_handle, max_output),
                child.wait()
            );
            status.map(|s| (s.code(), stdout, stderr, out_cut || err_cut))
        };

        let result = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => None,
            r = async {
                match timeout {
                    Some(t) => tokio::time::timeout(t, run).await.ok(),
                    None => Some(run.await),
                }
            } => Some(r),
        };

        match result {
            Some(Some(Ok((exit_code, stdout, stderr, truncated)))) => {
                debug!(program = %spec.program, exit_code = ?exit_code, truncated, "Process exited");
                Ok(ProcessOutput {
                    exit_code,
                    stdout,
                    stderr,
                    truncated,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Some(Some(Err(e))) => Err(ProcessError::Io(e.to_string())),
            Some(None) => {
                let _ = child.kill().await;
                let after = timeout.unwrap_or_default();
                warn!(program = %spec.program, timeout_ms = after.as_millis() as u64, "Process timed out; killed");
                Err(ProcessError::TimedOut(after))
            }
            None => {
                let _ = child.kill().await;
                debug!(program = %spec.program, "Process cancelled; killed");
                Err(ProcessError::Cancelled)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn base_env() -> Vec<(String, String)> {
        std::env::var("PATH")
            .map(|p| vec![("PATH".to_string(), p)])
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_runs_argv_without_shell() {
        let spec = ProcessSpec::new("echo")
            .with_args(vec!["a; rm -rf /".to_string(), "$HOME".to_string()])
            .with_env(base_env());
        let out = TokioProcessExecutor::new()
            .run(&CallContext::new(), spec)
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout), "a; rm -rf / $HOME\n");
    }

    #[tokio::test]
    async fn test_environment_is_cleared() {
        let spec = ProcessSpec::new("env").with_env(vec![
            ("PATH".to_string(), std::env::var("PATH").unwrap_or_default()),
            ("ONLY_ME".to_string(), "1".to_string()),
        ]);
        let out = TokioProcessExecutor::new()
            .run(&CallContext::new(), spec)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&out.stdout);
        assert!(text.contains("ONLY_ME=1"));
        assert!(!text.contains("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn test_output_is_bounded() {
        let spec = ProcessSpec::new("head")
            .with_args(vec!["-c".to_string(), "10000".to_string(), "/dev/zero".to_string()])
            .with_env(base_env())
            .with_max_output_bytes(100);
        let out = TokioProcessExecutor::new()
            .run(&CallContext::new(), spec)
            .await
            .unwrap();
        assert_eq!(out.stdout.len(), 100);
        assert!(out.truncated);
    }

    #[tokio::test]
    async fn test_stdin_is_delivered() {
        let spec = ProcessSpec::new("cat")
            .with_env(base_env())
            .with_stdin(b"{\"x\":1}".to_vec());
        let out = TokioProcessExecutor::new()
            .run(&CallContext::new(), spec)
            .await
            .unwrap();
        assert_eq!(out.stdout, b"{\"x\":1}");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let spec = ProcessSpec::new("sleep")
            .with_args(vec!["5".to_string()])
            .with_env(base_env())
            .with_timeout(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let err = TokioProcessExecutor::new()
            .run(&CallContext::new(), spec)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_cancellation_kills_child() {
        let ctx = CallContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });
        let spec = ProcessSpec::new("sleep")
            .with_args(vec!["5".to_string()])
            .with_env(base_env());
        let err = TokioProcessExecutor::new().run(&ctx, spec).await.unwrap_err();
        assert_eq!(err, ProcessError::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_command() {
        let spec = ProcessSpec::new("definitely-not-a-real-command-xyz").with_env(base_env());
        let err = TokioProcessExecutor::new()
            .run(&CallContext::new(), spec)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "command not found: definitely-not-a-real-command-xyz"
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let spec = ProcessSpec::new("ls")
            .with_args(vec!["/definitely/not/here".to_string()])
            .with_env(base_env());
        let out = TokioProcessExecutor::new()
            .run(&CallContext::new(), spec)
            .await
            .unwrap();
        assert!(!out.success());
        assert!(!out.stderr.is_empty());
    }
}
