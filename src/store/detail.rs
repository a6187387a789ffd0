//! Extracted detail text per event.
//!
//! No TTL: an entry stays valid until the detail stage is forced to
//! regenerate it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::domain::{EventDetail, EventId};

use super::KeyValueStore;

pub struct DetailStore {
    store: Arc<dyn KeyValueStore>,
}

impl DetailStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the detail for `event_id`.
    ///
    /// An unreadable document is logged and reported as absent so the
    /// detail stage re-extracts it.
    pub async fn load(&self, event_id: &EventId) -> Result<Option<EventDetail>> {
        let Some(bytes) = self.store.get(event_id.as_str()).await? else {
            return Ok(None);
        };

        let document = match String::from_utf8(bytes) {
            Ok(document) => document,
            Err(_) => {
                warn!(%event_id, "Detail document is not UTF-8, treating as absent");
                return Ok(None);
            }
        };

        match EventDetail::from_document(event_id.clone(), &document) {
            Some(detail) if !detail.content.trim().is_empty() => Ok(Some(detail)),
            _ => {
                warn!(%event_id, "Detail document is malformed, treating as absent");
                Ok(None)
            }
        }
    }

    /// Overwrite the detail for its event
    pub async fn save(&self, detail: &EventDetail) -> Result<()> {
        self.store
            .put(detail.event_id.as_str(), detail.to_document().as_bytes())
            .await
            .with_context(|| format!("Failed to save detail for {}", detail.event_id))
    }

}
