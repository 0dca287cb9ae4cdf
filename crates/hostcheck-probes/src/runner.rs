//! External command execution with an optional timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::{ProbeError, Result};

/// Captured result of one command run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited successfully.
    pub success: bool,
}

impl CommandOutput {
    /// Whether this run passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// One-line explanation of a failed run, suitable for an audit record.
    pub fn failure_message(&self, program: &str) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("`{}` exited with code {}", program, self.exit_code)
        } else {
            let last = stderr.lines().last().unwrap_or(stderr);
            format!("`{}` exited with code {}: {}", program, self.exit_code, last)
        }
    }
}

/// Runs external commands on behalf of probes and fixes.
pub struct CommandRunner;

impl CommandRunner {
    /// Execute `command` (first element is the executable).
    ///
    /// A `timeout_secs` of zero waits indefinitely. On timeout the child is
    /// killed.
    pub async fn execute(name: &str, command: &[String], timeout_secs: u64) -> Result<CommandOutput> {
        let start = Instant::now();

        let (exe, args) = command.split_first().ok_or_else(|| ProbeError::EmptyCommand {
            name: name.to_string(),
        })?;

        let child = Command::new(exe)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: exe.clone(),
                source,
            })?;

        let waited = if timeout_secs > 0 {
            tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
                .await
                .map_err(|_| ProbeError::Timeout {
                    program: exe.clone(),
                    timeout_secs,
                })?
        } else {
            child.wait_with_output().await
        };
        let output = waited.map_err(|source| ProbeError::Spawn {
            program: exe.clone(),
            source,
        })?;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        };

        tracing::debug!(
            name = %name,
            program = %exe,
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "command finished"
        );
        Ok(result)
    }

    /// Blocking wrapper around [`CommandRunner::execute`].
    ///
    /// Builds a current-thread runtime for the duration of the call, so it
    /// must not be called from inside an async context.
    pub fn run(name: &str, command: &[String], timeout_secs: u64) -> Result<CommandOutput> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProbeError::Runtime)?;
        runtime.block_on(Self::execute(name, command, timeout_secs))
    }
}
