//! Postgres access for the map change monitor.
//!
//! The monitor holds exactly one connection for its whole lifetime; the
//! pool is only a handle around it.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Open the single persistent connection.
///
/// TLS is always requested. `PgSslMode::Require` encrypts the session but
/// does not verify the server certificate.
pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(database_url)?.ssl_mode(PgSslMode::Require);

    PgPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect_with(options)
        .await
}

/// Server version string, e.g. `PostgreSQL 16.2 on x86_64-pc-linux-gnu ...`.
pub async fn server_version(pool: &DbPool) -> Result<String, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT version()").fetch_one(pool).await
}
