//! The cached event list and its staleness rule.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::record::EventRecord;

/// Validity window of a snapshot (24 hours)
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// The whole event list as of its last successful scrape.
///
/// Replaced wholesale on every write; never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventListSnapshot {
    /// When the snapshot was written (not when any event was scraped)
    pub timestamp: DateTime<Utc>,

    /// Listing page the events came from
    #[serde(rename = "url")]
    pub source_url: String,

    pub events: Vec<EventRecord>,
}

impl EventListSnapshot {
    pub fn new(source_url: impl Into<String>, events: Vec<EventRecord>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            source_url: source_url.into(),
            events,
        }
    }

    /// A snapshot is usable only while `now - timestamp < ttl`
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.timestamp) < ttl
    }

    /// Age of the snapshot at `now`
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
    }

    /// Events matching a free-text query, in listing order
    pub fn search(&self, query: &str) -> Vec<&EventRecord> {
        self.events.iter().filter(|e| e.matches(query)).collect()
    }
}
