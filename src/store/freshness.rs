//! Event list cache with a single staleness clock.
//!
//! Every caller that needs the event list goes through
//! [`FreshnessStore::current`]; nothing else compares timestamps.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::{EventListSnapshot, EventRecord, StageError, StageResult, DEFAULT_TTL_HOURS};
use crate::source::EventSource;

use super::KeyValueStore;

/// Fixed key of the snapshot
pub const SNAPSHOT_KEY: &str = "events";

pub struct FreshnessStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl FreshnessStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_ttl(store, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Load the persisted snapshot regardless of age.
    ///
    /// Returns `None` when nothing was written yet or the payload is
    /// unreadable; corruption is logged and otherwise treated as stale.
    pub async fn read(&self) -> Option<EventListSnapshot> {
        let bytes = match self.store.get(SNAPSHOT_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Failed to read event snapshot, treating as stale");
                return None;
            }
        };

        match serde_json::from_slice::<EventListSnapshot>(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Event snapshot is corrupt, treating as stale");
                None
            }
        }
    }

    /// Replace the snapshot wholesale, stamped with the write moment
    pub async fn write(&self, source_url: &str, events: Vec<EventRecord>) -> Result<EventListSnapshot> {
        let snapshot = EventListSnapshot::new(source_url, events, Utc::now());
        let json = serde_json::to_vec_pretty(&snapshot).context("Failed to serialize event snapshot")?;

        self.store
            .put(SNAPSHOT_KEY, &json)
            .await
            .context("Failed to persist event snapshot")?;

        info!(events = snapshot.events.len(), url = %snapshot.source_url, "Event snapshot written");
        Ok(snapshot)
    }

    pub fn is_fresh(&self, snapshot: &EventListSnapshot, now: DateTime<Utc>) -> bool {
        snapshot.is_fresh_at(now, self.ttl)
    }

    /// The event list, refreshed from `source` first if missing or stale
    pub async fn current(&self, source: &dyn EventSource) -> StageResult<EventListSnapshot> {
        self.current_at(source, Utc::now()).await
    }

    /// [`current`](Self::current) evaluated at an explicit instant
    pub async fn current_at(
        &self,
        source: &dyn EventSource,
        now: DateTime<Utc>,
    ) -> StageResult<EventListSnapshot> {
        match self.read().await {
            Some(snapshot) if self.is_fresh(&snapshot, now) => {
                debug!(
                    age_minutes = snapshot.age_at(now).num_minutes(),
                    "Serving cached event snapshot"
                );
                Ok(snapshot)
            }
            Some(snapshot) => {
                info!(
                    age_hours = snapshot.age_at(now).num_hours(),
                    "Event snapshot is stale, refreshing"
                );
                self.refresh(source).await
            }
            None => {
                info!("No usable event snapshot, scraping");
                self.refresh(source).await
            }
        }
    }

    /// Scrape unconditionally and replace the snapshot
    pub async fn refresh(&self, source: &dyn EventSource) -> StageResult<EventListSnapshot> {
        let events = source.fetch_events().await.map_err(StageError::transport)?;

        self.write(source.source_url(), events)
            .await
            .map_err(StageError::transport)
    }
}
