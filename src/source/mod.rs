//! Event list sources.
//!
//! A source turns one fetch of the listing page into an ordered list of
//! [`EventRecord`]s. The freshness store decides when to call it.

pub mod jsonld;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::EventRecord;

pub use jsonld::JsonLdEventSource;

/// Produces the event list from a listing page
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Listing page the events come from
    fn source_url(&self) -> &str;

    /// Fetch and extract events, in page order
    async fn fetch_events(&self) -> Result<Vec<EventRecord>>;
}
