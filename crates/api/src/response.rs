//! Shared response envelope types for API handlers.
//!
//! Resource-style responses use a `{ "data": ... }` envelope. The KPI and
//! ingestion endpoints keep their bare wire shapes for compatibility with
//! the dashboards consuming them.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
