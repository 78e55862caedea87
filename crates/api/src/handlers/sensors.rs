//! Handlers for sensor configuration and liveness.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use vigia_core::error::CoreError;
use vigia_core::telemetry::SensorConfig;
use vigia_db::models::sensor::SensorHealth;
use vigia_db::repositories::SensorRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /sensors/config
///
/// Register or replace a sensor's configuration document. Goes through
/// the resolver's write-through path so the cache is overwritten after
/// the durable write commits.
pub async fn upsert_config(
    State(state): State<AppState>,
    Json(config): Json<SensorConfig>,
) -> AppResult<impl IntoResponse> {
    if config.sensor_id.trim().is_empty() {
        return Err(CoreError::Validation("sensorId must not be empty".to_string()).into());
    }

    let stored = state.resolver.upsert(&config).await?;
    tracing::info!(sensor_id = %stored.sensor_id, version = %stored.config_version, "Sensor config stored");

    Ok((StatusCode::CREATED, Json(DataResponse { data: stored })))
}

/// GET /sensors/{sensorId}/health
///
/// Liveness view: whether the sensor is active and when it last reported.
pub async fn sensor_health(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
) -> AppResult<Json<DataResponse<SensorHealth>>> {
    let sensor = SensorRepo::get_by_sensor_id(&state.pool, &sensor_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "sensor",
            id: sensor_id,
        })?;

    Ok(Json(DataResponse {
        data: SensorHealth {
            active: sensor.active,
            last_seen: sensor.last_seen,
        },
    }))
}
