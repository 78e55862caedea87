//! Failure history models.

use sqlx::FromRow;
use vigia_core::reliability::FailureObservation;
use vigia_core::types::{DbId, Timestamp};

/// A failure row joined with the `performed_at` of its earliest attending
/// maintenance. `resolved_at` is set exactly once when the incident is
/// closed.
#[derive(Debug, Clone, FromRow)]
pub struct FailureWithAttention {
    pub id: DbId,
    pub machine_id: DbId,
    pub ingenio_id: DbId,
    pub sensor_id: Option<String>,
    pub severity: String,
    pub status: String,
    pub occurred_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub attended_at: Option<Timestamp>,
}

impl FailureWithAttention {
    /// Project into the shape the reliability engine computes over.
    pub fn observation(&self) -> FailureObservation {
        FailureObservation {
            occurred_at: self.occurred_at,
            resolved_at: self.resolved_at,
            attended_at: self.attended_at,
        }
    }
}
