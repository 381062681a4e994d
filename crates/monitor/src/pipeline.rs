//! Per-job pipeline: resolve → patch → settle → restart → acknowledge.
//!
//! Each stage returns a `Result` and the first failure ends the job. The
//! queued flag is only cleared once every earlier stage has succeeded, so a
//! failed job is picked up again on the next cycle.

use std::time::Duration;

use mapchange_core::config_patch::{ConfigPatcher, PatchError};
use mapchange_core::restart::{InstanceRestarter, RestartError};
use mapchange_core::types::ServerId;
use mapchange_db::models::wipe::QueuedWipe;

use crate::store::WipeStore;

/// Why a job stopped before its restart completed.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("backend lookup failed: {0}")]
    Lookup(#[source] sqlx::Error),

    #[error("no server_backend_info row for server {0}")]
    MissingMapping(ServerId),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Restart(#[from] RestartError),
}

/// Result of running one job through the pipeline.
#[derive(Debug)]
pub enum JobOutcome {
    /// Config patched and instance restarted.
    Applied {
        folder: String,
        previous_level_url: String,
        /// `false` when the flag write-back failed or matched no row; the
        /// job will be re-applied next cycle.
        acknowledged: bool,
    },
    /// A stage failed; the request stays queued.
    Failed(JobError),
}

impl JobOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Outcome for one queued request.
#[derive(Debug)]
pub struct JobReport {
    pub server_id: ServerId,
    pub level_url: String,
    pub outcome: JobOutcome,
}

/// Applied stages, carried into the acknowledge step.
struct Applied {
    folder: String,
    previous_level_url: String,
}

/// The ordered stages plus the collaborators they call.
pub struct Pipeline<S, R> {
    store: S,
    patcher: ConfigPatcher,
    restarter: R,
    settle_delay: Duration,
}

impl<S, R> Pipeline<S, R>
where
    S: WipeStore,
    R: InstanceRestarter,
{
    pub fn new(store: S, patcher: ConfigPatcher, restarter: R, settle_delay: Duration) -> Self {
        Self {
            store,
            patcher,
            restarter,
            settle_delay,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one job end to end. Never fails: every error is folded into the
    /// returned report.
    pub async fn run(&self, job: &QueuedWipe) -> JobReport {
        let outcome = match self.apply(job).await {
            Ok(applied) => {
                let acknowledged = self.acknowledge(&job.server_id).await;
                JobOutcome::Applied {
                    folder: applied.folder,
                    previous_level_url: applied.previous_level_url,
                    acknowledged,
                }
            }
            Err(e) => {
                tracing::warn!(
                    server_id = %job.server_id,
                    error = %e,
                    "Map change not applied, request stays queued",
                );
                JobOutcome::Failed(e)
            }
        };

        JobReport {
            server_id: job.server_id.clone(),
            level_url: job.level_url.clone(),
            outcome,
        }
    }

    async fn apply(&self, job: &QueuedWipe) -> Result<Applied, JobError> {
        let folder = self.resolve(&job.server_id).await?;

        tracing::info!(
            server_id = %job.server_id,
            folder = %folder,
            level_url = %job.level_url,
            "Updating map for server",
        );

        let report = self.patcher.patch(&folder, &job.level_url).await?;
        tracing::info!(
            server_id = %job.server_id,
            previous = %report.previous,
            changed = report.changed,
            "Config updated and verified",
        );

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        self.restarter.restart(&folder).await?;

        Ok(Applied {
            folder,
            previous_level_url: report.previous,
        })
    }

    async fn resolve(&self, server_id: &str) -> Result<String, JobError> {
        match self.store.resolve_folder(server_id).await {
            Ok(Some(folder)) => Ok(folder),
            Ok(None) => Err(JobError::MissingMapping(server_id.to_string())),
            Err(e) => Err(JobError::Lookup(e)),
        }
    }

    /// Clear the queued flag. Failure is logged only; the restart has
    /// already happened and is not undone.
    async fn acknowledge(&self, server_id: &str) -> bool {
        match self.store.set_queued(server_id, false).await {
            Ok(0) => {
                tracing::warn!(server_id, "Acknowledge matched no next_wipe_info row");
                false
            }
            Ok(_) => {
                tracing::info!(server_id, "Request acknowledged");
                true
            }
            Err(e) => {
                tracing::error!(server_id, error = %e, "Failed to acknowledge request");
                false
            }
        }
    }
}
