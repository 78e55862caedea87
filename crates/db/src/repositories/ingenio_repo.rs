//! Repository for the `ingenios` table.

use sqlx::PgPool;
use vigia_core::types::DbId;

use crate::models::ingenio::Ingenio;

const COLUMNS: &str = "id, name, active, created_at";

pub struct IngenioRepo;

impl IngenioRepo {
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Ingenio>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ingenios WHERE id = $1");
        sqlx::query_as::<_, Ingenio>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of all active ingenios, for the hourly rollup sweep.
    pub async fn list_active_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM ingenios WHERE active = TRUE ORDER BY id")
            .fetch_all(pool)
            .await
    }
}
