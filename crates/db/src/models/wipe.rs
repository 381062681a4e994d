//! `next_wipe_info` rows.

use mapchange_core::types::ServerId;
use sqlx::FromRow;

/// A row from the `next_wipe_info` table.
#[derive(Debug, Clone, FromRow)]
pub struct WipeRequest {
    pub server_id: ServerId,
    pub level_url: String,
    pub is_queued: bool,
}

/// Projection of a queued `next_wipe_info` row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct QueuedWipe {
    pub server_id: ServerId,
    pub level_url: String,
}
