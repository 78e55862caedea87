//! Point-in-time reliability KPI orchestration.
//!
//! Fetches a scope's failure history and hands it to the reliability
//! engine. Shared by the metrics handlers and the hourly rollup job.

use chrono::Utc;
use vigia_core::error::CoreError;
use vigia_core::reliability::{self, FailureObservation, ReliabilityMetrics};
use vigia_core::types::DbId;
use vigia_db::models::failure::FailureWithAttention;
use vigia_db::repositories::{FailureRepo, IngenioRepo, MachineRepo};
use vigia_db::DbPool;

use crate::error::AppResult;

/// KPIs for one machine, computed from its full failure history.
pub async fn machine_metrics(pool: &DbPool, machine_id: DbId) -> AppResult<ReliabilityMetrics> {
    let machine = MachineRepo::get(pool, machine_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "machine",
            id: machine_id.to_string(),
        })?;
    let failures = FailureRepo::list_for_machine(pool, machine_id).await?;
    Ok(reliability::compute(
        machine.created_at,
        Utc::now(),
        &observations(&failures),
    ))
}

/// KPIs for one ingenio, computed from the failures of all its machines.
pub async fn ingenio_metrics(pool: &DbPool, ingenio_id: DbId) -> AppResult<ReliabilityMetrics> {
    let ingenio = IngenioRepo::get(pool, ingenio_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ingenio",
            id: ingenio_id.to_string(),
        })?;
    let failures = FailureRepo::list_for_ingenio(pool, ingenio_id).await?;
    Ok(reliability::compute(
        ingenio.created_at,
        Utc::now(),
        &observations(&failures),
    ))
}

fn observations(failures: &[FailureWithAttention]) -> Vec<FailureObservation> {
    failures.iter().map(FailureWithAttention::observation).collect()
}
