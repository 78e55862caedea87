//! Repository for the `readings` store (append-only, document-style).
//!
//! This is the persistence sink behind the ingestion queue. Rows are
//! written once and never updated; there is deliberately no transaction
//! spanning this table and the relational entities.

use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use vigia_core::telemetry::{Reading, ReadingMetrics};
use vigia_core::types::Timestamp;

#[derive(FromRow)]
struct ReadingRow {
    sensor_id: String,
    timestamp: Timestamp,
    metrics: Json<ReadingMetrics>,
}

impl ReadingRow {
    fn into_reading(self) -> Reading {
        Reading {
            sensor_id: self.sensor_id,
            timestamp: self.timestamp,
            metrics: self.metrics.0,
        }
    }
}

pub struct ReadingRepo;

impl ReadingRepo {
    /// Append one reading.
    pub async fn insert(pool: &PgPool, reading: &Reading) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO readings (sensor_id, timestamp, metrics) VALUES ($1, $2, $3)")
            .bind(&reading.sensor_id)
            .bind(reading.timestamp)
            .bind(Json(&reading.metrics))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// The `limit` most recent readings of a sensor, returned oldest-first
    /// (the order the analysis engine expects).
    pub async fn list_recent(
        pool: &PgPool,
        sensor_id: &str,
        limit: i64,
    ) -> Result<Vec<Reading>, sqlx::Error> {
        let rows: Vec<ReadingRow> = sqlx::query_as(
            "SELECT sensor_id, timestamp, metrics FROM readings \
             WHERE sensor_id = $1 \
             ORDER BY timestamp DESC \
             LIMIT $2",
        )
        .bind(sensor_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        let mut readings: Vec<Reading> = rows.into_iter().map(ReadingRow::into_reading).collect();
        readings.reverse();
        Ok(readings)
    }
}
