//! Persistence collaborators for the vigia platform.
//!
//! Postgres pool bootstrap and migrations, entity models and repositories,
//! the key-value config cache, and the read-through sensor-config resolver.
//! The raw readings table is deliberately independent of the relational
//! entities (no foreign keys, no shared transaction): it stands in for the
//! document store the readings pipeline writes to.

pub mod cache;
pub mod models;
pub mod repositories;
pub mod resolver;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Shared Postgres connection pool type.
pub type DbPool = PgPool;

/// Create a connection pool against `database_url`.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from the crate's `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
