//! Sensor entity model and derived views.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use vigia_core::telemetry::{MetricsConfig, SensorConfig};
use vigia_core::types::{DbId, Timestamp};

/// Row of the `sensors` table.
#[derive(Debug, Clone, FromRow)]
pub struct Sensor {
    pub id: DbId,
    pub sensor_id: String,
    pub ingenio_id: DbId,
    pub machine_id: Option<DbId>,
    pub name: String,
    pub sensor_type: String,
    pub location: Option<String>,
    pub interval_ms: i64,
    pub metrics_config: Json<MetricsConfig>,
    pub active: bool,
    pub config_version: String,
    pub last_seen: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Sensor {
    /// The configuration document derived from this row; what the resolver
    /// caches and the classification/analysis engines consume.
    pub fn into_config(self) -> SensorConfig {
        SensorConfig {
            sensor_id: self.sensor_id,
            ingenio_id: self.ingenio_id,
            machine_id: self.machine_id,
            name: self.name,
            sensor_type: self.sensor_type,
            location: self.location,
            interval_ms: self.interval_ms,
            metrics_config: self.metrics_config.0,
            created_at: Some(self.created_at),
            last_seen: self.last_seen,
            active: self.active,
            config_version: self.config_version,
        }
    }
}

/// Liveness view returned by the sensor health endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorHealth {
    pub active: bool,
    pub last_seen: Option<Timestamp>,
}
