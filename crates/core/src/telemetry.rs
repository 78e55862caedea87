//! Telemetry data model shared by ingestion, classification, and analysis.
//!
//! Boundary JSON is camelCase with ISO-8601 timestamps; internally all
//! times are `chrono::DateTime<Utc>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Operating bounds for a single metric. Either bound may be absent; a
/// metric with neither bound cannot be violated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Threshold configuration grouped by category, then metric name.
pub type MetricsConfig = BTreeMap<String, BTreeMap<String, MetricRange>>;

/// Configuration document for one sensor.
///
/// Immutable per `config_version`; updates replace the document wholesale
/// through the resolver's write-through path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorConfig {
    pub sensor_id: String,
    pub ingenio_id: DbId,
    #[serde(default)]
    pub machine_id: Option<DbId>,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    #[serde(default)]
    pub location: Option<String>,
    pub interval_ms: i64,
    pub metrics_config: MetricsConfig,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub last_seen: Option<Timestamp>,
    pub active: bool,
    pub config_version: String,
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Raw metric values grouped by category, then metric name.
///
/// Leaf values stay as JSON until classification so a malformed entry can
/// be reported as `invalid` instead of rejecting the whole reading.
pub type ReadingMetrics = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

/// One telemetry reading as posted by a sensor. Immutable after ingestion;
/// persisted once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: String,
    pub timestamp: Timestamp,
    pub metrics: ReadingMetrics,
}
