//! Synthesized audio per event. Terminal cache: nothing reads it downstream.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::EventId;

use super::{ChunkStream, KeyValueStore};

pub struct VoiceStore {
    store: Arc<dyn KeyValueStore>,
}

impl VoiceStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stream audio chunks into the clip for `event_id`, replacing any old clip.
    ///
    /// An empty stream is an error and keeps the old clip.
    pub async fn write_stream(&self, event_id: &EventId, chunks: ChunkStream) -> Result<u64> {
        self.store
            .put_chunks(event_id.as_str(), chunks)
            .await
            .with_context(|| format!("Failed to store audio for {}", event_id))
    }

    /// Stored size, `None` when no clip exists
    pub async fn size(&self, event_id: &EventId) -> Result<Option<u64>> {
        self.store.size(event_id.as_str()).await
    }

    pub async fn remove(&self, event_id: &EventId) -> Result<()> {
        self.store.remove(event_id.as_str()).await
    }

    /// Reference handed to callers (the clip's location)
    pub fn reference(&self, event_id: &EventId) -> String {
        self.store.locate(event_id.as_str())
    }
}
