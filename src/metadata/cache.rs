//! In-memory metadata cache with a time-to-live

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::MetadataSource;
use super::models::MetadataSnapshot;

// Keeps the conversion to milliseconds inside i64
const MAX_TTL_SECS: u64 = (i64::MAX / 1000) as u64;

#[derive(Debug)]
struct CachedSnapshot {
    snapshot: Arc<MetadataSnapshot>,
    cached_at: DateTime<Utc>,
}

/// Holds the last snapshot fetched from a [`MetadataSource`]
#[derive(Debug)]
pub struct MetadataCache {
    ttl: Duration,
    entry: RwLock<Option<CachedSnapshot>>,
}

impl MetadataCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            entry: RwLock::new(None),
        }
    }

    /// Return the cached snapshot, refetching once it has expired
    pub async fn get_or_fetch(&self, source: &dyn MetadataSource) -> Result<Arc<MetadataSnapshot>> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Ok(snapshot);
        }

        let mut entry = self.entry.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = entry.as_ref().filter(|c| self.is_fresh(c.cached_at)) {
            return Ok(cached.snapshot.clone());
        }

        log::debug!("Metadata cache miss, fetching from source");
        let snapshot = Arc::new(source.fetch_metadata().await?);
        log::info!("Cached metadata for {} entities", snapshot.entities.len());
        *entry = Some(CachedSnapshot {
            snapshot: snapshot.clone(),
            cached_at: Utc::now(),
        });
        Ok(snapshot)
    }

    pub async fn invalidate(&self) {
        log::debug!("Invalidating metadata cache");
        *self.entry.write().await = None;
    }

    pub async fn fresh_snapshot(&self) -> Option<Arc<MetadataSnapshot>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|cached| self.is_fresh(cached.cached_at))
            .map(|cached| cached.snapshot.clone())
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        Utc::now() - cached_at < self.ttl
    }
}
