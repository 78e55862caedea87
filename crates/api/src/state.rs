use std::sync::Arc;

use vigia_core::queue::IngestQueue;
use vigia_core::telemetry::Reading;
use vigia_db::resolver::ConfigResolver;

use crate::config::ServerConfig;
use crate::ws::BroadcastBus;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: vigia_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Tenant-scoped WebSocket broadcast bus (dashboard clients).
    pub bus: Arc<BroadcastBus>,
    /// Bounded ingestion queue feeding the persistence sink.
    pub queue: IngestQueue<Reading>,
    /// Cached sensor-configuration resolver.
    pub resolver: ConfigResolver,
}
