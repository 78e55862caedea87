//! Repository for the `failures` table.

use sqlx::PgPool;
use vigia_core::types::DbId;

use crate::models::failure::FailureWithAttention;

/// Column list including the attending maintenance's `performed_at`.
const COLUMNS: &str = "\
    f.id, f.machine_id, f.ingenio_id, f.sensor_id, f.severity, f.status, \
    f.occurred_at, f.resolved_at, m.performed_at AS attended_at";

/// Joins each failure with its earliest attending maintenance, so a
/// single query feeds the MTTR/MTTA/MTBF computation.
const ATTENTION_JOIN: &str = "\
    LEFT JOIN LATERAL ( \
        SELECT performed_at FROM maintenances \
        WHERE failure_id = f.id \
        ORDER BY performed_at ASC LIMIT 1 \
    ) m ON TRUE";

/// Provides read access to failure history.
pub struct FailureRepo;

impl FailureRepo {
    /// All failures of a machine, ordered by occurrence (ascending).
    pub async fn list_for_machine(
        pool: &PgPool,
        machine_id: DbId,
    ) -> Result<Vec<FailureWithAttention>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM failures f {ATTENTION_JOIN} \
             WHERE f.machine_id = $1 \
             ORDER BY f.occurred_at ASC"
        );
        sqlx::query_as::<_, FailureWithAttention>(&query)
            .bind(machine_id)
            .fetch_all(pool)
            .await
    }

    /// All failures of an ingenio, ordered by occurrence (ascending).
    pub async fn list_for_ingenio(
        pool: &PgPool,
        ingenio_id: DbId,
    ) -> Result<Vec<FailureWithAttention>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM failures f {ATTENTION_JOIN} \
             WHERE f.ingenio_id = $1 \
             ORDER BY f.occurred_at ASC"
        );
        sqlx::query_as::<_, FailureWithAttention>(&query)
            .bind(ingenio_id)
            .fetch_all(pool)
            .await
    }
}
