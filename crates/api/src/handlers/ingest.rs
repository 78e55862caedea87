//! Ingestion endpoint: validate, classify, fan out, enqueue.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use vigia_core::classify;
use vigia_core::telemetry::Reading;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /ingest
///
/// Accepts one reading, classifies it against the sensor's configuration,
/// pushes the classified view to the owning ingenio's dashboards, and
/// queues the raw reading for persistence. The two paths are independent:
/// a full persistence queue never blocks the live stream, and a missing
/// configuration degrades classification to all-`unknown` instead of
/// failing the reading.
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    if !body.is_object() {
        return Err(AppError::BadRequest(
            "Invalid or missing payload".to_string(),
        ));
    }
    for field in ["sensorId", "timestamp", "metrics"] {
        if body.get(field).is_none() {
            return Err(AppError::BadRequest(format!(
                "Missing required field: {field}"
            )));
        }
    }
    let reading: Reading = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Malformed reading: {e}")))?;

    // Resolve thresholds. A missing sensor or an unreachable store degrades
    // classification; thresholds are never invented.
    let config = match state.resolver.resolve(&reading.sensor_id).await {
        Ok(Some(config)) => Some(config),
        Ok(None) => {
            tracing::warn!(sensor_id = %reading.sensor_id, "No config found for sensor");
            None
        }
        Err(e) => {
            tracing::error!(sensor_id = %reading.sensor_id, error = %e, "Config resolution failed");
            None
        }
    };

    let classified = match &config {
        Some(config) => classify::classify(&reading, config),
        None => classify::classify_unconfigured(&reading),
    };

    // Persistence path, best-effort: a full buffer drops this reading and
    // the sensor resends on its next interval tick.
    if let Err(e) = state.queue.enqueue(reading) {
        tracing::warn!(sensor_id = %classified.sensor_id, error = %e, "Reading dropped from persistence path");
    }

    // Live path: only attributable readings from active sensors reach a
    // dashboard.
    if let Some(config) = &config {
        if config.active {
            state
                .bus
                .publish_to_ingenio("reading", &classified, config.ingenio_id)
                .await;
        }
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "ok": true }))))
}
