//! Interval poller with a single-flight guard.
//!
//! Every tick spawns one poll cycle. A cycle that outlives the interval
//! still holds the guard when the next tick fires, and that tick is
//! skipped without touching the database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mapchange_core::restart::InstanceRestarter;
use mapchange_core::types::Timestamp;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{JobReport, Pipeline};
use crate::store::WipeStore;

/// Summary of one completed poll cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: Timestamp,
    pub jobs: Vec<JobReport>,
}

impl CycleReport {
    pub fn applied(&self) -> usize {
        self.jobs.iter().filter(|j| j.outcome.is_applied()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.applied()
    }
}

/// What a single call to [`MapChangeMonitor::poll_once`] did.
#[derive(Debug)]
pub enum PollOutcome {
    /// Another cycle was in progress; nothing was queried.
    Skipped,
    /// Listing queued jobs failed; no job was processed.
    Failed(sqlx::Error),
    /// Every queued job was attempted.
    Completed(CycleReport),
}

/// Clears the in-progress flag when the cycle ends, including on panic.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Polls for queued map changes and applies them.
pub struct MapChangeMonitor<S, R> {
    pipeline: Pipeline<S, R>,
    poll_interval: Duration,
    in_progress: AtomicBool,
}

impl<S, R> MapChangeMonitor<S, R>
where
    S: WipeStore + 'static,
    R: InstanceRestarter + 'static,
{
    pub fn new(pipeline: Pipeline<S, R>, poll_interval: Duration) -> Self {
        Self {
            pipeline,
            poll_interval,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Whether a cycle currently holds the guard.
    pub fn is_busy(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(&self.in_progress))
    }

    /// Run one poll cycle unless another is already running.
    pub async fn poll_once(&self) -> PollOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::warn!("Previous check still in progress, skipping this tick");
            return PollOutcome::Skipped;
        };

        let started_at = Utc::now();
        tracing::info!("Starting map change check cycle");

        let queued = match self.pipeline.store().list_queued().await {
            Ok(queued) => queued,
            Err(e) => {
                tracing::error!(error = %e, "Error checking for queued map changes");
                return PollOutcome::Failed(e);
            }
        };

        if queued.is_empty() {
            tracing::debug!("No servers queued for map changes");
        } else {
            tracing::info!(count = queued.len(), "Servers queued for map changes");
        }

        let mut jobs = Vec::with_capacity(queued.len());
        for job in &queued {
            jobs.push(self.pipeline.run(job).await);
        }

        let report = CycleReport { started_at, jobs };
        tracing::info!(
            applied = report.applied(),
            failed = report.failed(),
            "Map change check cycle completed",
        );

        PollOutcome::Completed(report)
    }

    /// Run the poll loop until `cancel` is triggered.
    ///
    /// The first cycle starts immediately. Cancelling stops new ticks, then
    /// waits for any cycle already spawned so a restarted instance is always
    /// acknowledged before this returns.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Map change monitor started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Map change monitor stopping");
                    break;
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Poll cycle task panicked");
                    }
                }
                _ = ticker.tick() => {
                    let monitor = Arc::clone(&self);
                    cycles.spawn(async move {
                        monitor.poll_once().await;
                    });
                }
            }
        }

        if self.is_busy() {
            tracing::info!("Waiting for the running cycle to finish");
        }
        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Poll cycle task panicked");
            }
        }
        tracing::info!("Map change monitor stopped");
    }
}
