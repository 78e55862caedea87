//! Repository for the `sensors` table.

use sqlx::types::Json;
use sqlx::PgPool;
use vigia_core::telemetry::SensorConfig;
use vigia_core::types::{DbId, Timestamp};

use crate::models::sensor::Sensor;

/// Column list for `sensors` SELECT queries.
const COLUMNS: &str = "\
    id, sensor_id, ingenio_id, machine_id, name, sensor_type, location, \
    interval_ms, metrics_config, active, config_version, last_seen, \
    created_at, updated_at";

/// Provides query operations for sensors and their configuration documents.
pub struct SensorRepo;

impl SensorRepo {
    /// Look up a sensor by its external string identifier.
    pub async fn get_by_sensor_id(
        pool: &PgPool,
        sensor_id: &str,
    ) -> Result<Option<Sensor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sensors WHERE sensor_id = $1");
        sqlx::query_as::<_, Sensor>(&query)
            .bind(sensor_id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch a sensor's configuration document, if the sensor exists.
    pub async fn get_config(
        pool: &PgPool,
        sensor_id: &str,
    ) -> Result<Option<SensorConfig>, sqlx::Error> {
        Ok(Self::get_by_sensor_id(pool, sensor_id)
            .await?
            .map(Sensor::into_config))
    }

    /// Insert or replace a sensor's configuration document.
    ///
    /// Returns the stored document (with database-assigned timestamps).
    pub async fn upsert(
        pool: &PgPool,
        config: &SensorConfig,
    ) -> Result<SensorConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO sensors \
                (sensor_id, ingenio_id, machine_id, name, sensor_type, location, \
                 interval_ms, metrics_config, active, config_version, last_seen) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (sensor_id) DO UPDATE SET \
                machine_id = EXCLUDED.machine_id, \
                name = EXCLUDED.name, \
                sensor_type = EXCLUDED.sensor_type, \
                location = EXCLUDED.location, \
                interval_ms = EXCLUDED.interval_ms, \
                metrics_config = EXCLUDED.metrics_config, \
                active = EXCLUDED.active, \
                config_version = EXCLUDED.config_version, \
                last_seen = EXCLUDED.last_seen, \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        let sensor = sqlx::query_as::<_, Sensor>(&query)
            .bind(&config.sensor_id)
            .bind(config.ingenio_id)
            .bind(config.machine_id)
            .bind(&config.name)
            .bind(&config.sensor_type)
            .bind(&config.location)
            .bind(config.interval_ms)
            .bind(Json(&config.metrics_config))
            .bind(config.active)
            .bind(&config.config_version)
            .bind(config.last_seen)
            .fetch_one(pool)
            .await?;
        Ok(sensor.into_config())
    }

    /// Active sensors mounted on a machine, for the analysis endpoint.
    pub async fn list_active_for_machine(
        pool: &PgPool,
        machine_id: DbId,
    ) -> Result<Vec<Sensor>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensors \
             WHERE machine_id = $1 AND active = TRUE \
             ORDER BY sensor_id"
        );
        sqlx::query_as::<_, Sensor>(&query)
            .bind(machine_id)
            .fetch_all(pool)
            .await
    }

    /// Record when a sensor was last heard from.
    pub async fn touch_last_seen(
        pool: &PgPool,
        sensor_id: &str,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sensors SET last_seen = $2 WHERE sensor_id = $1")
            .bind(sensor_id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }
}
