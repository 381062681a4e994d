//! Job repository seam used by the pipeline.
//!
//! [`WipeStore`] is the narrow view of the database the monitor needs.
//! [`PgWipeStore`] backs it with the shared connection; tests substitute an
//! in-memory implementation.

use std::future::Future;

use mapchange_db::models::wipe::QueuedWipe;
use mapchange_db::repositories::{BackendRepo, WipeRepo};
use mapchange_db::DbPool;

/// Queued-job access for the poll cycle.
pub trait WipeStore: Send + Sync {
    /// Every request with `is_queued = true`.
    fn list_queued(&self) -> impl Future<Output = Result<Vec<QueuedWipe>, sqlx::Error>> + Send;

    /// Instance folder for `server_id`, `None` when unmapped.
    fn resolve_folder(
        &self,
        server_id: &str,
    ) -> impl Future<Output = Result<Option<String>, sqlx::Error>> + Send;

    /// Set the queued flag; returns the number of rows updated.
    fn set_queued(
        &self,
        server_id: &str,
        is_queued: bool,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

/// [`WipeStore`] over the monitor's Postgres connection.
#[derive(Debug, Clone)]
pub struct PgWipeStore {
    pool: DbPool,
}

impl PgWipeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl WipeStore for PgWipeStore {
    async fn list_queued(&self) -> Result<Vec<QueuedWipe>, sqlx::Error> {
        WipeRepo::list_queued(&self.pool).await
    }

    async fn resolve_folder(&self, server_id: &str) -> Result<Option<String>, sqlx::Error> {
        BackendRepo::find_folder(&self.pool, server_id).await
    }

    async fn set_queued(&self, server_id: &str, is_queued: bool) -> Result<u64, sqlx::Error> {
        WipeRepo::set_queued(&self.pool, server_id, is_queued).await
    }
}
