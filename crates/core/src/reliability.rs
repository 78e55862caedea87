//! Reliability KPI computation: MTBF, MTTR, MTTA, availability.
//!
//! Operates on a scope's failure history (machine or ingenio). The caller
//! fetches the rows and supplies "now", so the math stays deterministic
//! and testable.

use serde::Serialize;

use crate::types::Timestamp;

/// One failure with its optional resolution and first maintenance action.
#[derive(Debug, Clone)]
pub struct FailureObservation {
    pub occurred_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    /// `performed_at` of the maintenance that attended this failure.
    pub attended_at: Option<Timestamp>,
}

/// Point-in-time reliability KPIs for a machine or ingenio scope.
/// All values are in hours except the two percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReliabilityMetrics {
    pub availability: Option<f64>,
    pub reliability: Option<f64>,
    pub mtbf: Option<f64>,
    pub mttr: Option<f64>,
    pub mtta: Option<f64>,
}

impl ReliabilityMetrics {
    /// KPIs for a scope with no recorded failures.
    pub fn no_failures() -> Self {
        Self {
            availability: Some(100.0),
            reliability: Some(100.0),
            mtbf: None,
            mttr: None,
            mtta: None,
        }
    }
}

/// Compute KPIs for one scope.
///
/// `failures` must be ordered by `occurred_at` ascending; `scope_created_at`
/// is when the machine/ingenio entered service.
///
/// Availability is intentionally not clamped to `[0, 100]`: a scope whose
/// accumulated downtime exceeds its service time reports a negative value,
/// which operators treat as an alarm in itself.
pub fn compute(
    scope_created_at: Timestamp,
    now: Timestamp,
    failures: &[FailureObservation],
) -> ReliabilityMetrics {
    if failures.is_empty() {
        return ReliabilityMetrics::no_failures();
    }

    let total = hours_between(scope_created_at, now);

    // MTTR: mean repair time over resolved failures only.
    let repair_times: Vec<f64> = failures
        .iter()
        .filter_map(|f| f.resolved_at.map(|r| hours_between(f.occurred_at, r)))
        .collect();
    let mttr = mean(&repair_times);

    // MTTA: mean time to the first maintenance action, over attended failures.
    let attention_times: Vec<f64> = failures
        .iter()
        .filter_map(|f| f.attended_at.map(|a| hours_between(f.occurred_at, a)))
        .collect();
    let mtta = mean(&attention_times);

    // MTBF: mean gap between consecutive occurrences; needs at least two.
    let mtbf = if failures.len() > 1 {
        let gaps: Vec<f64> = failures
            .windows(2)
            .map(|w| hours_between(w[0].occurred_at, w[1].occurred_at))
            .collect();
        mean(&gaps)
    } else {
        None
    };

    // Open failures count as down until "now".
    let downtime: f64 = failures
        .iter()
        .map(|f| hours_between(f.occurred_at, f.resolved_at.unwrap_or(now)))
        .sum();

    let availability = (total > 0.0).then(|| (total - downtime) / total * 100.0);

    let reliability = match (mtbf, mttr) {
        (Some(b), Some(r)) if b + r > 0.0 => Some(b / (b + r) * 100.0),
        _ => None,
    };

    ReliabilityMetrics {
        availability,
        reliability,
        mtbf,
        mttr,
        mtta,
    }
}

/// Difference `b - a` in fractional hours.
fn hours_between(a: Timestamp, b: Timestamp) -> f64 {
    (b - a).num_milliseconds() as f64 / 3_600_000.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn at_hours(h: i64) -> Timestamp {
        t0() + Duration::hours(h)
    }

    fn failure(occurred: i64, resolved: Option<i64>, attended: Option<i64>) -> FailureObservation {
        FailureObservation {
            occurred_at: at_hours(occurred),
            resolved_at: resolved.map(at_hours),
            attended_at: attended.map(at_hours),
        }
    }

    #[test]
    fn no_failures_yields_perfect_scores() {
        let metrics = compute(t0(), at_hours(100), &[]);

        assert_eq!(metrics.availability, Some(100.0));
        assert_eq!(metrics.reliability, Some(100.0));
        assert_eq!(metrics.mtbf, None);
        assert_eq!(metrics.mttr, None);
        assert_eq!(metrics.mtta, None);
    }

    #[test]
    fn evenly_spaced_resolved_failures() {
        // Failures at hours 0, 10, 20, each resolved 2 hours later.
        let failures = vec![
            failure(0, Some(2), None),
            failure(10, Some(12), None),
            failure(20, Some(22), None),
        ];

        let metrics = compute(t0(), at_hours(100), &failures);

        assert_eq!(metrics.mtbf, Some(10.0));
        assert_eq!(metrics.mttr, Some(2.0));
        assert_eq!(metrics.mtta, None);
        // Downtime 6h over 100h.
        assert_eq!(metrics.availability, Some(94.0));
        // 10 / 12 * 100
        let reliability = metrics.reliability.unwrap();
        assert!((reliability - 83.3333).abs() < 1e-3);
    }

    #[test]
    fn unresolved_failures_excluded_from_mttr_but_count_as_downtime() {
        let failures = vec![failure(0, Some(4), None), failure(10, None, None)];

        let metrics = compute(t0(), at_hours(20), &failures);

        // Only the resolved failure contributes to MTTR.
        assert_eq!(metrics.mttr, Some(4.0));
        // Downtime: 4h + (20 - 10)h open = 14h over 20h.
        assert_eq!(metrics.availability, Some(30.0));
    }

    #[test]
    fn single_failure_has_no_mtbf_and_no_reliability() {
        let failures = vec![failure(5, Some(6), None)];

        let metrics = compute(t0(), at_hours(10), &failures);

        assert_eq!(metrics.mtbf, None);
        assert_eq!(metrics.reliability, None);
        assert_eq!(metrics.mttr, Some(1.0));
    }

    #[test]
    fn mtta_averages_attended_failures_only() {
        let failures = vec![
            failure(0, Some(5), Some(1)),
            failure(10, Some(15), Some(13)),
            failure(20, None, None),
        ];

        let metrics = compute(t0(), at_hours(30), &failures);

        // (1 + 3) / 2
        assert_eq!(metrics.mtta, Some(2.0));
    }

    #[test]
    fn availability_goes_negative_when_downtime_exceeds_service_time() {
        // Scope created at hour 10, failure open since hour 0 (imported
        // history predating the scope record).
        let failures = vec![failure(0, None, None)];

        let metrics = compute(at_hours(10), at_hours(20), &failures);

        // total = 10h, downtime = 20h -> -100%.
        assert_eq!(metrics.availability, Some(-100.0));
    }

    #[test]
    fn zero_elapsed_scope_has_null_availability() {
        let failures = vec![failure(0, Some(1), None)];

        let metrics = compute(at_hours(5), at_hours(5), &failures);

        assert_eq!(metrics.availability, None);
    }

    #[test]
    fn serializes_nulls_for_missing_values() {
        let value = serde_json::to_value(ReliabilityMetrics::no_failures()).unwrap();

        assert_eq!(value["availability"], 100.0);
        assert_eq!(value["reliability"], 100.0);
        assert!(value["mtbf"].is_null());
        assert!(value["mttr"].is_null());
        assert!(value["mtta"].is_null());
    }
}
