//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health
///
/// Reports service liveness and whether the database answers a trivial
/// query. Always returns 200 so load balancers can distinguish "up but
/// degraded" from "down" via the body.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_healthy = vigia_db::health_check(&state.pool).await.is_ok();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "db_healthy": db_healthy,
    }))
}
