//! Instance restart via the external instance manager.
//!
//! The restart is a plain subprocess: `<program> <args...> <folder>`, run
//! without a shell and awaited to completion. Captured stdout/stderr are
//! only ever logged.

use std::future::Future;
use std::time::Instant;

use tokio::process::Command;

use crate::instance;

/// Default restart command. The instance folder is appended as the final
/// argument.
pub const DEFAULT_RESTART_COMMAND: &str = "sudo -u amp ampinstmgr -r";

/// Error type for restart operations.
#[derive(Debug, thiserror::Error)]
pub enum RestartError {
    #[error("invalid instance folder name: {0:?}")]
    InvalidFolder(String),

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("restart command failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Captured output from a successful restart.
#[derive(Debug, Clone)]
pub struct RestartOutput {
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Restarts one instance, identified by its folder name.
pub trait InstanceRestarter: Send + Sync {
    fn restart(
        &self,
        folder: &str,
    ) -> impl Future<Output = Result<RestartOutput, RestartError>> + Send;
}

/// [`InstanceRestarter`] backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandRestarter {
    program: String,
    args: Vec<String>,
}

impl Default for CommandRestarter {
    fn default() -> Self {
        Self::new(
            "sudo",
            ["-u", "amp", "ampinstmgr", "-r"].map(String::from).to_vec(),
        )
    }
}

impl CommandRestarter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a whitespace-separated command line such as
    /// `sudo -u amp ampinstmgr -r`. Returns `None` for a blank line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl InstanceRestarter for CommandRestarter {
    async fn restart(&self, folder: &str) -> Result<RestartOutput, RestartError> {
        if !instance::is_safe_folder_name(folder) {
            return Err(RestartError::InvalidFolder(folder.to_string()));
        }

        tracing::info!(
            program = %self.program,
            args = ?self.args,
            folder,
            "Executing instance restart",
        );

        let start = Instant::now();
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(folder)
            .output()
            .await
            .map_err(|source| RestartError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::error!(folder, duration_ms, stderr = %stderr.trim(), "Restart failed");
            return Err(RestartError::Failed {
                exit_code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        if !stderr.trim().is_empty() {
            tracing::warn!(folder, stderr = %stderr.trim(), "Restart wrote to stderr");
        }
        tracing::debug!(folder, stdout = %stdout.trim(), "Restart output");
        tracing::info!(folder, duration_ms, "Restart succeeded");

        Ok(RestartOutput {
            stdout,
            stderr,
            duration_ms,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
