//! Handlers for the reliability KPI endpoints.
//!
//! Responses are the bare `{availability, reliability, mtbf, mttr, mtta}`
//! object (numbers or null) the dashboards chart directly.

use axum::extract::{Path, State};
use axum::Json;
use vigia_core::error::CoreError;
use vigia_core::reliability::ReliabilityMetrics;
use vigia_core::types::DbId;
use vigia_db::repositories::SensorRepo;

use crate::error::AppResult;
use crate::kpi;
use crate::state::AppState;

/// GET /metrics/machine/{id}
pub async fn machine_metrics(
    State(state): State<AppState>,
    Path(machine_id): Path<DbId>,
) -> AppResult<Json<ReliabilityMetrics>> {
    Ok(Json(kpi::machine_metrics(&state.pool, machine_id).await?))
}

/// GET /metrics/ingenio/{id}
pub async fn ingenio_metrics(
    State(state): State<AppState>,
    Path(ingenio_id): Path<DbId>,
) -> AppResult<Json<ReliabilityMetrics>> {
    Ok(Json(kpi::ingenio_metrics(&state.pool, ingenio_id).await?))
}

/// GET /metrics/sensor/{id}
///
/// Failure history is tracked per machine, so a sensor's KPIs are those of
/// the machine it is mounted on. A sensor without a machine assignment has
/// no history to report and yields 404.
pub async fn sensor_metrics(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
) -> AppResult<Json<ReliabilityMetrics>> {
    let sensor = SensorRepo::get_by_sensor_id(&state.pool, &sensor_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "sensor",
            id: sensor_id.clone(),
        })?;
    let machine_id = sensor.machine_id.ok_or_else(|| CoreError::NotFound {
        entity: "machine assignment",
        id: sensor_id.clone(),
    })?;
    Ok(Json(kpi::machine_metrics(&state.pool, machine_id).await?))
}
