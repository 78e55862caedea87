//! Repository for the hourly KPI tables (append-only time-series).

use sqlx::types::Json;
use sqlx::PgPool;
use vigia_core::types::{DbId, Timestamp};

use crate::models::kpi::ProcessMetrics;

/// Writes rollup rows; one row per scope per job run, never updated.
pub struct KpiRepo;

impl KpiRepo {
    /// Append one machine-scoped KPI row.
    pub async fn insert_machine_hour(
        pool: &PgPool,
        machine_id: DbId,
        timestamp: Timestamp,
        availability: f64,
        metrics: &ProcessMetrics,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO machine_hourly_kpis \
                (machine_id, timestamp, availability, process_metrics) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(machine_id)
        .bind(timestamp)
        .bind(availability)
        .bind(Json(metrics))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Append one ingenio-scoped KPI row.
    pub async fn insert_ingenio_hour(
        pool: &PgPool,
        ingenio_id: DbId,
        timestamp: Timestamp,
        availability: f64,
        metrics: &ProcessMetrics,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO ingenio_hourly_kpis \
                (ingenio_id, timestamp, availability, process_metrics) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(ingenio_id)
        .bind(timestamp)
        .bind(availability)
        .bind(Json(metrics))
        .execute(pool)
        .await?;
        Ok(())
    }
}
