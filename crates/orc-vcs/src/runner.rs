// runner.rs — Directory-scoped command execution.
//
// `CommandRunner` is the seam between the pipeline and the operating system.
// The production runner spawns through tokio with a hard timeout; tests swap
// in a scripted runner so probes never depend on a real `git` binary.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::VcsError;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` inside `dir`, giving up after `timeout`.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, VcsError>;
}

/// Runs real processes via `tokio::process`. A timed-out child is killed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, VcsError> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir).kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| VcsError::Spawn {
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(VcsError::Timeout {
                    program: program.to_string(),
                    after: timeout,
                })
            }
        };

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
