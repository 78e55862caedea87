//! Read-through cached resolver for sensor configuration.

use std::sync::Arc;

use vigia_core::telemetry::SensorConfig;

use crate::cache::{sensor_config_key, ConfigCache};
use crate::repositories::SensorRepo;
use crate::DbPool;

/// Read-through cache in front of the `sensors` table.
///
/// The cache is never the source of truth: writes go to Postgres first and
/// then overwrite the cache key. Entries carry no TTL — a stale entry is
/// corrected only by the next explicit write, so every config update must
/// go through [`ConfigResolver::upsert`].
#[derive(Clone)]
pub struct ConfigResolver {
    pool: DbPool,
    cache: Arc<dyn ConfigCache>,
}

impl ConfigResolver {
    pub fn new(pool: DbPool, cache: Arc<dyn ConfigCache>) -> Self {
        Self { pool, cache }
    }

    /// Resolve a sensor's configuration.
    ///
    /// Cache errors on this path are logged and treated as misses; only an
    /// error from the durable store propagates, so the caller can degrade
    /// classification instead of inventing thresholds.
    pub async fn resolve(&self, sensor_id: &str) -> Result<Option<SensorConfig>, sqlx::Error> {
        let key = sensor_config_key(sensor_id);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(config) => return Ok(Some(config)),
                Err(e) => {
                    tracing::warn!(sensor_id, error = %e, "Discarding undecodable cached config");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(sensor_id, error = %e, "Config cache read failed; falling back to database");
            }
        }

        let Some(config) = SensorRepo::get_config(&self.pool, sensor_id).await? else {
            return Ok(None);
        };

        self.populate(&key, &config).await;
        Ok(Some(config))
    }

    /// Write-through update: durable store first, then the cache key.
    pub async fn upsert(&self, config: &SensorConfig) -> Result<SensorConfig, sqlx::Error> {
        let stored = SensorRepo::upsert(&self.pool, config).await?;
        self.populate(&sensor_config_key(&stored.sensor_id), &stored)
            .await;
        Ok(stored)
    }

    async fn populate(&self, key: &str, config: &SensorConfig) {
        let raw = match serde_json::to_string(config) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Config not cacheable");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &raw).await {
            tracing::warn!(key, error = %e, "Config cache write failed");
        }
    }
}
