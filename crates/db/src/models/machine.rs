use sqlx::FromRow;
use vigia_core::types::{DbId, Timestamp};

/// A machine within an ingenio. `created_at` marks when the machine
/// entered service and anchors the availability window.
#[derive(Debug, Clone, FromRow)]
pub struct Machine {
    pub id: DbId,
    pub ingenio_id: DbId,
    pub name: String,
    pub active: bool,
    pub created_at: Timestamp,
}
