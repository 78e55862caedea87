//! Repository for the `machines` table.

use sqlx::PgPool;
use vigia_core::types::DbId;

use crate::models::machine::Machine;

const COLUMNS: &str = "id, ingenio_id, name, active, created_at";

pub struct MachineRepo;

impl MachineRepo {
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Machine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machines WHERE id = $1");
        sqlx::query_as::<_, Machine>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// IDs of all active machines, for the hourly rollup sweep.
    pub async fn list_active_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM machines WHERE active = TRUE ORDER BY id")
            .fetch_all(pool)
            .await
    }
}
