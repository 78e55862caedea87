//! Threshold classification for incoming readings.
//!
//! Pure logic — no I/O. Given a reading and the sensor's configuration,
//! produce the per-metric statuses, the issue list, and the overall
//! severity that the live dashboard consumes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::telemetry::{MetricRange, MetricsConfig, Reading, SensorConfig};
use crate::types::Timestamp;

/// Exceedance percentage above which a breached metric escalates from
/// warning to critical.
pub const CRITICAL_EXCEEDANCE_PERCENT: f64 = 20.0;

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Classification of a single metric value against its configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Ok,
    Low,
    High,
    /// No configuration entry exists for this category/metric.
    Unknown,
    /// The value is not a finite number.
    Invalid,
}

/// Aggregated status of a whole reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Warning,
    Critical,
}

impl OverallStatus {
    /// Derive the overall status from the maximum per-metric severity.
    pub fn from_severity(severity: u8) -> Self {
        match severity {
            0 => OverallStatus::Ok,
            1 => OverallStatus::Warning,
            _ => OverallStatus::Critical,
        }
    }
}

/// Direction of a threshold breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreachKind {
    Low,
    High,
}

// ---------------------------------------------------------------------------
// Classified reading
// ---------------------------------------------------------------------------

/// One threshold violation within a reading.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Qualified metric name, `"{category}.{metric}"`.
    pub metric: String,
    #[serde(rename = "type")]
    pub kind: BreachKind,
    pub value: f64,
    pub limit: f64,
    pub exceedance_percent: f64,
}

/// A single metric value with its classification.
#[derive(Debug, Clone, Serialize)]
pub struct MetricReport {
    pub value: serde_json::Value,
    pub status: MetricStatus,
}

/// Derived, non-persisted view of a reading.
///
/// Recomputed on every ingestion against the configuration in force at
/// that moment; callers may cache the latest one per sensor for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedReading {
    pub sensor_id: String,
    pub timestamp: Timestamp,
    pub status: OverallStatus,
    pub metrics: BTreeMap<String, BTreeMap<String, MetricReport>>,
    pub issues: Vec<Issue>,
    pub total_issues: usize,
    pub severity_level: u8,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a reading against its sensor configuration.
pub fn classify(reading: &Reading, config: &SensorConfig) -> ClassifiedReading {
    classify_against(reading, Some(&config.metrics_config))
}

/// Degraded classification used when no configuration could be resolved:
/// every finite metric reports `unknown` rather than inventing thresholds.
pub fn classify_unconfigured(reading: &Reading) -> ClassifiedReading {
    classify_against(reading, None)
}

fn classify_against(reading: &Reading, ranges: Option<&MetricsConfig>) -> ClassifiedReading {
    let mut metrics = BTreeMap::new();
    let mut issues: Vec<Issue> = Vec::new();
    let mut max_severity = 0u8;

    for (category, values) in &reading.metrics {
        let mut report = BTreeMap::new();

        for (metric, raw) in values {
            let Some(value) = raw.as_f64().filter(|v| v.is_finite()) else {
                report.insert(
                    metric.clone(),
                    MetricReport {
                        value: raw.clone(),
                        status: MetricStatus::Invalid,
                    },
                );
                continue;
            };

            let range = ranges
                .and_then(|r| r.get(category))
                .and_then(|c| c.get(metric));
            let Some(range) = range else {
                report.insert(
                    metric.clone(),
                    MetricReport {
                        value: raw.clone(),
                        status: MetricStatus::Unknown,
                    },
                );
                continue;
            };

            let (status, severity) = match breach(value, range) {
                Some((kind, limit)) => {
                    let exceedance = exceedance_percent(value, limit);
                    issues.push(Issue {
                        metric: format!("{category}.{metric}"),
                        kind,
                        value,
                        limit,
                        exceedance_percent: exceedance,
                    });
                    let severity = if exceedance > CRITICAL_EXCEEDANCE_PERCENT {
                        2
                    } else {
                        1
                    };
                    let status = match kind {
                        BreachKind::Low => MetricStatus::Low,
                        BreachKind::High => MetricStatus::High,
                    };
                    (status, severity)
                }
                None => (MetricStatus::Ok, 0),
            };

            max_severity = max_severity.max(severity);
            report.insert(
                metric.clone(),
                MetricReport {
                    value: raw.clone(),
                    status,
                },
            );
        }

        metrics.insert(category.clone(), report);
    }

    let total_issues = issues.len();
    ClassifiedReading {
        sensor_id: reading.sensor_id.clone(),
        timestamp: reading.timestamp,
        status: OverallStatus::from_severity(max_severity),
        metrics,
        issues,
        total_issues,
        severity_level: max_severity,
    }
}

/// Bound comparisons are strict: a value exactly on a limit is in range.
fn breach(value: f64, range: &MetricRange) -> Option<(BreachKind, f64)> {
    if let Some(min) = range.min {
        if value < min {
            return Some((BreachKind::Low, min));
        }
    }
    if let Some(max) = range.max {
        if value > max {
            return Some((BreachKind::High, max));
        }
    }
    None
}

/// Breach distance relative to the violated bound, as a percentage.
/// Bounds near zero are floored at 1 to keep the ratio meaningful.
fn exceedance_percent(value: f64, limit: f64) -> f64 {
    (value - limit).abs() / limit.abs().max(1.0) * 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
