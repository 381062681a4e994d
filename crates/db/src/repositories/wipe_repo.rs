//! Repository for the `next_wipe_info` table.
//!
//! The table is owned by an external actor that sets `is_queued = true`.
//! The monitor only ever reads it and clears the flag.

use sqlx::PgPool;

use crate::models::wipe::{QueuedWipe, WipeRequest};

/// Column list for `next_wipe_info` queries.
const COLUMNS: &str = "server_id, level_url, is_queued";

/// Provides query operations for queued level changes.
pub struct WipeRepo;

impl WipeRepo {
    /// List every request currently waiting to be applied.
    ///
    /// An empty result is the normal idle state.
    pub async fn list_queued(pool: &PgPool) -> Result<Vec<QueuedWipe>, sqlx::Error> {
        sqlx::query_as::<_, QueuedWipe>(
            "SELECT server_id, level_url \
             FROM next_wipe_info \
             WHERE is_queued = true",
        )
        .fetch_all(pool)
        .await
    }

    /// Fetch the full request row for one server.
    pub async fn find(
        pool: &PgPool,
        server_id: &str,
    ) -> Result<Option<WipeRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM next_wipe_info WHERE server_id = $1");
        sqlx::query_as::<_, WipeRequest>(&query)
            .bind(server_id)
            .fetch_optional(pool)
            .await
    }

    /// Set the queued flag for one server. Returns the number of rows
    /// updated (0 when the server has no request row).
    pub async fn set_queued(
        pool: &PgPool,
        server_id: &str,
        is_queued: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE next_wipe_info SET is_queued = $1 WHERE server_id = $2")
            .bind(is_queued)
            .bind(server_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
