//! Domain logic for the vigia telemetry platform.
//!
//! Everything here is independent of the database and the HTTP layer:
//! threshold classification, reliability KPIs, trend analysis, and the
//! bounded ingestion queue. The `api` crate wires these into the running
//! service; the `db` crate supplies the data they operate on.

pub mod analysis;
pub mod classify;
pub mod error;
pub mod queue;
pub mod reliability;
pub mod telemetry;
pub mod types;
