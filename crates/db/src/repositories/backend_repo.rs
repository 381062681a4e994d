//! Repository for the `server_backend_info` table (read-only).

use sqlx::PgPool;

/// Resolves logical server ids to on-disk instance folders.
pub struct BackendRepo;

impl BackendRepo {
    /// Instance folder for `server_id`, or `None` when no mapping exists.
    pub async fn find_folder(
        pool: &PgPool,
        server_id: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT server_folder FROM server_backend_info WHERE server_id = $1",
        )
        .bind(server_id)
        .fetch_optional(pool)
        .await
    }
}
