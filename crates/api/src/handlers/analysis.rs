//! Handlers for the trend/diagnostic analysis endpoint.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use vigia_core::analysis::{self, SensorReport};
use vigia_core::error::CoreError;
use vigia_core::types::{DbId, Timestamp};
use vigia_db::repositories::{MachineRepo, ReadingRepo, SensorRepo};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Cap on readings fetched per sensor for one analysis pass.
const MAX_READINGS_PER_SENSOR: i64 = 500;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MachineSummary {
    pub id: DbId,
    pub name: String,
}

/// Timestamped batch of per-sensor reports.
#[derive(Debug, Serialize)]
pub struct AnalysisEnvelope {
    pub timestamp: Timestamp,
    pub report: Vec<SensorReport>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeMachineResponse {
    pub machine: MachineSummary,
    pub analysis: AnalysisEnvelope,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// GET /analysis/machine/{id}
///
/// Runs the trend/urgency analysis over the recent readings of every
/// active sensor mounted on the machine. A sensor whose config or readings
/// cannot be fetched is skipped (logged); the batch continues with the
/// rest.
pub async fn analyze_machine(
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
) -> AppResult<Json<AnalyzeMachineResponse>> {
    let machine = MachineRepo::get(&state.pool, machine_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "machine",
            id: machine_id.to_string(),
        })?;

    let sensors = SensorRepo::list_active_for_machine(&state.pool, machine.id).await?;
    if sensors.is_empty() {
        return Err(AppError::BadRequest(
            "Machine has no active sensors assigned".to_string(),
        ));
    }

    tracing::info!(
        machine_id = machine.id,
        sensors = sensors.len(),
        "Analysing machine"
    );

    let mut report = Vec::new();
    for sensor in sensors {
        let config = match state.resolver.resolve(&sensor.sensor_id).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::warn!(sensor_id = %sensor.sensor_id, "No config found for sensor; skipping");
                continue;
            }
            Err(e) => {
                tracing::error!(sensor_id = %sensor.sensor_id, error = %e, "Config resolution failed; skipping");
                continue;
            }
        };

        let readings = match ReadingRepo::list_recent(
            &state.pool,
            &sensor.sensor_id,
            MAX_READINGS_PER_SENSOR,
        )
        .await
        {
            Ok(readings) => readings,
            Err(e) => {
                tracing::error!(sensor_id = %sensor.sensor_id, error = %e, "Reading fetch failed; skipping");
                continue;
            }
        };
        if readings.is_empty() {
            continue;
        }

        report.push(analysis::analyze_sensor(&config, &readings));
    }

    if report.is_empty() {
        return Err(AppError::BadRequest(
            "No reading data available for this machine".to_string(),
        ));
    }

    Ok(Json(AnalyzeMachineResponse {
        machine: MachineSummary {
            id: machine.id,
            name: machine.name,
        },
        analysis: AnalysisEnvelope {
            timestamp: Utc::now(),
            report,
        },
    }))
}
