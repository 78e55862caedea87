use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// An ingenio: the tenant scope owning machines, sensors, and dashboard
/// viewers. Rows are managed by the surrounding platform; this service
/// only reads them.
#[derive(Debug, Clone, FromRow)]
pub struct Ingenio {
    pub id: DbId,
    pub name: String,
    pub active: bool,
    pub created_at: Timestamp,
}
