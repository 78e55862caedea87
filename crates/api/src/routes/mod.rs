pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the application route tree.
///
/// ```text
/// POST /ingest                        one reading in, 202 on accept
/// GET  /ws?ingenio={id}               live classified-reading stream
///
/// GET  /metrics/machine/{id}          point-in-time reliability KPIs
/// GET  /metrics/sensor/{id}           KPIs of the sensor's machine
/// GET  /metrics/ingenio/{id}          ingenio-wide KPIs
///
/// GET  /analysis/machine/{id}         trend/urgency/chart analysis
///
/// POST /sensors/config                upsert sensor configuration
/// GET  /sensors/{sensorId}/health     sensor liveness view
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingest", post(handlers::ingest::ingest))
        .route("/ws", get(ws::ws_handler))
        .route(
            "/metrics/machine/{id}",
            get(handlers::metrics::machine_metrics),
        )
        .route(
            "/metrics/sensor/{id}",
            get(handlers::metrics::sensor_metrics),
        )
        .route(
            "/metrics/ingenio/{id}",
            get(handlers::metrics::ingenio_metrics),
        )
        .route(
            "/analysis/machine/{id}",
            get(handlers::analysis::analyze_machine),
        )
        .route("/sensors/config", post(handlers::sensors::upsert_config))
        .route(
            "/sensors/{sensor_id}/health",
            get(handlers::sensors::sensor_health),
        )
}
