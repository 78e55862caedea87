//! Trend and urgency analysis over batches of historical readings.
//!
//! For every metric named in a sensor's configuration this computes an
//! ordinary-least-squares trend, a range-proximity urgency, and a
//! downsampled series for charting. Pure logic; the caller fetches the
//! readings and orders them chronologically.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::telemetry::{MetricRange, Reading, SensorConfig};
use crate::types::Timestamp;

/// Maximum number of chart points returned per metric series.
pub const MAX_CHART_POINTS: usize = 50;

/// Fraction of the series mean below which a slope counts as flat.
const FLAT_SLOPE_RATIO: f64 = 0.005;

/// Proximity ratios (distance-to-bound over range width) for the urgency bands.
const URGENCY_VERY_HIGH_RATIO: f64 = 0.10;
const URGENCY_MODERATE_RATIO: f64 = 0.25;

const INSUFFICIENT_DATA_MSG: &str = "No hay suficientes datos para análisis";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Direction of a metric over the analysed window. The wire vocabulary is
/// the Spanish one the dashboards were built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    #[serde(rename = "subiendo")]
    Rising,
    #[serde(rename = "bajando")]
    Falling,
    #[serde(rename = "estable")]
    Stable,
}

/// How close the latest value sits to its configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Urgency {
    #[serde(rename = "fuera de rango")]
    OutOfRange,
    #[serde(rename = "muy alta")]
    VeryHigh,
    #[serde(rename = "moderada")]
    Moderate,
    #[serde(rename = "normal")]
    Normal,
}

/// Full analysis for one metric.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAnalysis {
    pub tendencia: Trend,
    /// Regression slope in metric units per hour.
    pub pendiente: f64,
    pub valor_actual: f64,
    pub rango: MetricRange,
    pub urgencia: Urgency,
}

/// Analysis outcome for one metric: a full report, or a short message when
/// the series has fewer than two usable points.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MetricOutcome {
    Analysis(MetricAnalysis),
    Insufficient { message: &'static str },
}

/// One point of a chart series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Downsampled series for one metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSeries {
    pub metric: String,
    pub data: Vec<ChartPoint>,
}

/// Per-sensor analysis: summary keyed by category/metric plus chart data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReport {
    pub sensor_id: String,
    pub resumen: BTreeMap<String, BTreeMap<String, MetricOutcome>>,
    pub chart_data: BTreeMap<String, Vec<MetricSeries>>,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Analyse one sensor's readings against its configuration.
///
/// `readings` must be in chronological order (oldest first). Metrics present
/// in readings but absent from the configuration are ignored.
pub fn analyze_sensor(config: &SensorConfig, readings: &[Reading]) -> SensorReport {
    let mut resumen = BTreeMap::new();
    let mut chart_data = BTreeMap::new();

    for (category, metrics) in &config.metrics_config {
        let mut category_report = BTreeMap::new();
        let mut category_series = Vec::new();

        for (metric, range) in metrics {
            let points = collect_points(readings, category, metric);

            if points.len() < 2 {
                category_report.insert(
                    metric.clone(),
                    MetricOutcome::Insufficient {
                        message: INSUFFICIENT_DATA_MSG,
                    },
                );
                continue;
            }

            let slope = slope_per_hour(&points);
            let current = points[points.len() - 1].value;
            let mean_y = points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64;

            let tendencia = if slope.abs() < mean_y.abs() * FLAT_SLOPE_RATIO {
                Trend::Stable
            } else if slope > 0.0 {
                Trend::Rising
            } else {
                Trend::Falling
            };

            category_report.insert(
                metric.clone(),
                MetricOutcome::Analysis(MetricAnalysis {
                    tendencia,
                    pendiente: slope,
                    valor_actual: current,
                    rango: *range,
                    urgencia: urgency(current, range),
                }),
            );

            category_series.push(MetricSeries {
                metric: metric.clone(),
                data: downsample(points),
            });
        }

        resumen.insert(category.clone(), category_report);
        chart_data.insert(category.clone(), category_series);
    }

    SensorReport {
        sensor_id: config.sensor_id.clone(),
        resumen,
        chart_data,
    }
}

/// Extract the finite numeric points of one metric, in reading order.
fn collect_points(readings: &[Reading], category: &str, metric: &str) -> Vec<ChartPoint> {
    readings
        .iter()
        .filter_map(|r| {
            let value = r
                .metrics
                .get(category)?
                .get(metric)?
                .as_f64()
                .filter(|v| v.is_finite())?;
            Some(ChartPoint {
                timestamp: r.timestamp,
                value,
            })
        })
        .collect()
}

/// Ordinary least-squares slope with time normalised to hours since the
/// first point (keeps x values small regardless of the epoch).
fn slope_per_hour(points: &[ChartPoint]) -> f64 {
    let n = points.len() as f64;
    let x0 = points[0].timestamp;

    let xs: Vec<f64> = points
        .iter()
        .map(|p| (p.timestamp - x0).num_milliseconds() as f64 / 3_600_000.0)
        .collect();

    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.value).sum::<f64>() / n;

    let numerator: f64 = xs
        .iter()
        .zip(points)
        .map(|(x, p)| (x - mean_x) * (p.value - mean_y))
        .sum();
    let denominator: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();

    if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Range-proximity urgency of the latest value. Requires both bounds; a
/// missing or degenerate range cannot raise urgency.
fn urgency(current: f64, range: &MetricRange) -> Urgency {
    let (Some(min), Some(max)) = (range.min, range.max) else {
        return Urgency::Normal;
    };
    if current > max || current < min {
        return Urgency::OutOfRange;
    }
    let span = max - min;
    if span <= 0.0 {
        return Urgency::Normal;
    }
    let distance = (max - current).min(current - min);
    let ratio = distance / span;
    if ratio <= URGENCY_VERY_HIGH_RATIO {
        Urgency::VeryHigh
    } else if ratio <= URGENCY_MODERATE_RATIO {
        Urgency::Moderate
    } else {
        Urgency::Normal
    }
}

/// Reduce a series to at most [`MAX_CHART_POINTS`] evenly-strided points.
///
/// The most recent point is force-appended when the stride does not land on
/// it, so the latest reading is always visible on a chart.
fn downsample(points: Vec<ChartPoint>) -> Vec<ChartPoint> {
    let len = points.len();
    if len <= MAX_CHART_POINTS {
        return points;
    }

    let mut out = Vec::with_capacity(MAX_CHART_POINTS + 1);
    let mut last_index = 0;
    for i in 0..MAX_CHART_POINTS {
        let index = i * len / MAX_CHART_POINTS;
        out.push(points[index].clone());
        last_index = index;
    }
    if last_index != len - 1 {
        out.push(points[len - 1].clone());
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MetricsConfig, ReadingMetrics};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn make_config(min: Option<f64>, max: Option<f64>) -> SensorConfig {
        let mut metrics_config = MetricsConfig::new();
        metrics_config
            .entry("mech".to_string())
            .or_default()
            .insert("temp".to_string(), MetricRange { min, max });
        SensorConfig {
            sensor_id: "s-1".to_string(),
            ingenio_id: 1,
            machine_id: Some(1),
            name: "s-1".to_string(),
            sensor_type: "thermal".to_string(),
            location: None,
            interval_ms: 1000,
            metrics_config,
            created_at: None,
            last_seen: None,
            active: true,
            config_version: "v1".to_string(),
        }
    }

    /// Readings one hour apart with the given temp values.
    fn make_readings(values: &[f64]) -> Vec<Reading> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut metrics = ReadingMetrics::new();
                metrics
                    .entry("mech".to_string())
                    .or_default()
                    .insert("temp".to_string(), json!(v));
                Reading {
                    sensor_id: "s-1".to_string(),
                    timestamp: t0() + Duration::hours(i as i64),
                    metrics,
                }
            })
            .collect()
    }

    fn analysis_of(report: &SensorReport) -> &MetricAnalysis {
        match &report.resumen["mech"]["temp"] {
            MetricOutcome::Analysis(a) => a,
            MetricOutcome::Insufficient { .. } => panic!("expected a full analysis"),
        }
    }

    #[test]
    fn linear_increase_is_rising_with_positive_slope() {
        let config = make_config(Some(0.0), Some(1000.0));
        // y = 2x over 10 hours.
        let readings = make_readings(&(0..10).map(|i| 2.0 * i as f64).collect::<Vec<_>>());

        let report = analyze_sensor(&config, &readings);
        let analysis = analysis_of(&report);

        assert_eq!(analysis.tendencia, Trend::Rising);
        assert!((analysis.pendiente - 2.0).abs() < 1e-9);
        assert_eq!(analysis.valor_actual, 18.0);
    }

    #[test]
    fn flat_series_is_stable() {
        let config = make_config(Some(0.0), Some(100.0));
        let readings = make_readings(&[50.0; 10]);

        let report = analyze_sensor(&config, &readings);
        let analysis = analysis_of(&report);

        assert_eq!(analysis.tendencia, Trend::Stable);
        assert_eq!(analysis.pendiente, 0.0);
    }

    #[test]
    fn linear_decrease_is_falling() {
        let config = make_config(Some(0.0), Some(1000.0));
        let readings = make_readings(&(0..10).map(|i| 100.0 - 3.0 * i as f64).collect::<Vec<_>>());

        let report = analyze_sensor(&config, &readings);

        assert_eq!(analysis_of(&report).tendencia, Trend::Falling);
    }

    #[test]
    fn fewer_than_two_points_is_insufficient() {
        let config = make_config(Some(0.0), Some(100.0));
        let readings = make_readings(&[42.0]);

        let report = analyze_sensor(&config, &readings);

        match &report.resumen["mech"]["temp"] {
            MetricOutcome::Insufficient { message } => {
                assert_eq!(*message, "No hay suficientes datos para análisis");
            }
            MetricOutcome::Analysis(_) => panic!("expected insufficient data"),
        }
        // No chart series is emitted for the starved metric.
        assert!(report.chart_data["mech"].is_empty());
    }

    #[test]
    fn non_numeric_values_are_skipped() {
        let config = make_config(Some(0.0), Some(100.0));
        let mut readings = make_readings(&[10.0, 20.0, 30.0]);
        readings[1]
            .metrics
            .get_mut("mech")
            .unwrap()
            .insert("temp".to_string(), json!("boom"));

        let report = analyze_sensor(&config, &readings);
        let analysis = analysis_of(&report);

        // Two usable points remain.
        assert_eq!(analysis.valor_actual, 30.0);
    }

    #[test]
    fn urgency_out_of_range() {
        let config = make_config(Some(0.0), Some(100.0));
        let readings = make_readings(&[50.0, 120.0]);

        let report = analyze_sensor(&config, &readings);

        assert_eq!(analysis_of(&report).urgencia, Urgency::OutOfRange);
    }

    #[test]
    fn urgency_bands_follow_proximity_ratio() {
        // Range [0, 100]: distance ratio 0.05 -> very high, 0.20 -> moderate,
        // 0.50 -> normal.
        for (value, expected) in [
            (95.0, Urgency::VeryHigh),
            (80.0, Urgency::Moderate),
            (50.0, Urgency::Normal),
        ] {
            let config = make_config(Some(0.0), Some(100.0));
            let readings = make_readings(&[value, value]);
            let report = analyze_sensor(&config, &readings);
            assert_eq!(analysis_of(&report).urgencia, expected, "value {value}");
        }
    }

    #[test]
    fn urgency_without_bounds_is_normal() {
        let config = make_config(None, None);
        let readings = make_readings(&[1e6, 2e6]);

        let report = analyze_sensor(&config, &readings);

        assert_eq!(analysis_of(&report).urgencia, Urgency::Normal);
    }

    #[test]
    fn short_series_is_not_downsampled() {
        let config = make_config(Some(0.0), Some(1000.0));
        let readings = make_readings(&(0..50).map(|i| i as f64).collect::<Vec<_>>());

        let report = analyze_sensor(&config, &readings);
        let series = &report.chart_data["mech"][0];

        assert_eq!(series.data.len(), 50);
    }

    #[test]
    fn long_series_downsamples_and_keeps_latest_point() {
        let config = make_config(Some(0.0), Some(1000.0));
        let readings = make_readings(&(0..200).map(|i| i as f64).collect::<Vec<_>>());

        let report = analyze_sensor(&config, &readings);
        let series = &report.chart_data["mech"][0];

        // 50 strided points plus the force-appended newest one.
        assert_eq!(series.data.len(), 51);
        assert_eq!(series.data[0].value, 0.0);
        assert_eq!(series.data.last().unwrap().value, 199.0);

        // Points remain chronological.
        for pair in series.data.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn wire_format_uses_spanish_vocabulary() {
        let config = make_config(Some(0.0), Some(100.0));
        let readings = make_readings(&(0..10).map(|i| 2.0 * i as f64).collect::<Vec<_>>());

        let value = serde_json::to_value(analyze_sensor(&config, &readings)).unwrap();
        let metric = &value["resumen"]["mech"]["temp"];

        assert_eq!(metric["tendencia"], "subiendo");
        assert!(metric["pendiente"].is_number());
        assert_eq!(metric["valorActual"], 18.0);
        assert_eq!(metric["urgencia"], "moderada");
        assert_eq!(value["chartData"]["mech"][0]["metric"], "temp");
    }
}
