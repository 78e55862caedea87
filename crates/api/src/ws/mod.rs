//! WebSocket infrastructure for the live telemetry stream.
//!
//! Provides the tenant-scoped broadcast bus, heartbeat monitoring, and the
//! HTTP upgrade handler used by the router.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::BroadcastBus;
