//! Hourly KPI rollup payloads.

use serde::{Deserialize, Serialize};
use vigia_core::reliability::ReliabilityMetrics;

/// Technical KPI payload stored in the `process_metrics` JSONB column of
/// the hourly rollup rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub reliability: Option<f64>,
    pub mtbf: Option<f64>,
    pub mttr: Option<f64>,
    pub mtta: Option<f64>,
}

impl From<&ReliabilityMetrics> for ProcessMetrics {
    fn from(metrics: &ReliabilityMetrics) -> Self {
        Self {
            reliability: metrics.reliability,
            mtbf: metrics.mtbf,
            mttr: metrics.mttr,
            mtta: metrics.mtta,
        }
    }
}
