/// Logical server identity as stored in `next_wipe_info.server_id`.
pub type ServerId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
