//! Stage events recorded in each event's journal.
//!
//! The journal is append-only; an event's progress is derived by replaying it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::record::EventId;

/// One enrichment stage, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Detail,
    Summary,
    Voice,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Detail => "detail",
            Stage::Summary => "summary",
            Stage::Voice => "voice",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in an event's journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// When this entry was written (ISO 8601)
    pub timestamp: DateTime<Utc>,

    pub event_id: EventId,

    pub stage: Stage,

    pub event_type: StageEventType,

    /// Idempotency key format: "{event_id}:{stage}:{input_hash}"
    pub idempotency_key: String,

    /// Human-readable summary (NO secrets)
    pub payload_summary: String,

    /// Time taken in milliseconds (for finished stages)
    pub duration_ms: Option<u64>,

    /// Error message if failed
    pub error: Option<String>,
}

impl StageEvent {
    pub fn new(
        event_id: EventId,
        stage: Stage,
        event_type: StageEventType,
        idempotency_key: String,
        payload_summary: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_id,
            stage,
            event_type,
            idempotency_key,
            payload_summary,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEventType {
    /// Stage began work
    StageStarted,

    /// Stage produced its artifact
    StageCompleted,

    /// Stage served an existing artifact without external calls
    StageSkipped,

    /// Stage returned an error outcome
    StageFailed,
}
