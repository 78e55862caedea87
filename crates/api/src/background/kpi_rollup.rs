//! Hourly reliability KPI rollup.
//!
//! Every hour: recompute point-in-time KPIs for every active machine, then
//! every active ingenio, and append one row per scope stamped with the
//! job's invocation time. The ingenio pass recomputes from raw failure
//! data — it is not an aggregate of the machine rows written moments
//! before. A per-scope failure is logged and skipped; the sweep continues.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use vigia_core::types::{DbId, Timestamp};
use vigia_db::models::kpi::ProcessMetrics;
use vigia_db::repositories::{IngenioRepo, KpiRepo, MachineRepo};

use crate::error::AppResult;
use crate::kpi;

/// How often the rollup runs. Scopes are processed sequentially and the
/// sweep is expected to finish well within this period; an overrun simply
/// delays the next tick's freshness.
const ROLLUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Availability stored for a scope whose service window rounds to zero
/// (no downtime has been observable yet).
const AVAILABILITY_FOR_NEW_SCOPE: f64 = 100.0;

/// Run the hourly rollup loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = ROLLUP_INTERVAL.as_secs(),
        "KPI rollup job started"
    );

    let mut interval = tokio::time::interval(ROLLUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("KPI rollup job stopping");
                break;
            }
            _ = interval.tick() => {
                run_once(&pool).await;
            }
        }
    }
}

/// One full sweep: machine scopes first, then ingenio scopes.
pub async fn run_once(pool: &PgPool) {
    let stamp = Utc::now();

    let machine_ids = match MachineRepo::list_active_ids(pool).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "KPI rollup: listing machines failed");
            return;
        }
    };
    tracing::info!(count = machine_ids.len(), "KPI rollup: processing machines");
    for machine_id in machine_ids {
        if let Err(e) = rollup_machine(pool, machine_id, stamp).await {
            tracing::error!(machine_id, error = %e, "KPI rollup: machine scope failed");
        }
    }

    let ingenio_ids = match IngenioRepo::list_active_ids(pool).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "KPI rollup: listing ingenios failed");
            return;
        }
    };
    tracing::info!(count = ingenio_ids.len(), "KPI rollup: processing ingenios");
    for ingenio_id in ingenio_ids {
        if let Err(e) = rollup_ingenio(pool, ingenio_id, stamp).await {
            tracing::error!(ingenio_id, error = %e, "KPI rollup: ingenio scope failed");
        }
    }

    tracing::info!("KPI rollup: sweep complete");
}

async fn rollup_machine(pool: &PgPool, machine_id: DbId, stamp: Timestamp) -> AppResult<()> {
    let metrics = kpi::machine_metrics(pool, machine_id).await?;
    KpiRepo::insert_machine_hour(
        pool,
        machine_id,
        stamp,
        metrics.availability.unwrap_or(AVAILABILITY_FOR_NEW_SCOPE),
        &ProcessMetrics::from(&metrics),
    )
    .await?;
    Ok(())
}

async fn rollup_ingenio(pool: &PgPool, ingenio_id: DbId, stamp: Timestamp) -> AppResult<()> {
    let metrics = kpi::ingenio_metrics(pool, ingenio_id).await?;
    KpiRepo::insert_ingenio_hour(
        pool,
        ingenio_id,
        stamp,
        metrics.availability.unwrap_or(AVAILABILITY_FOR_NEW_SCOPE),
        &ProcessMetrics::from(&metrics),
    )
    .await?;
    Ok(())
}
