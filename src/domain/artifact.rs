//! Artifacts produced by the enrichment stages.
//!
//! Each artifact is keyed by [`EventId`]; stores keep only the latest write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::EventId;

const URL_PREFIX: &str = "Event URL: ";
const EXTRACTED_PREFIX: &str = "Extracted on: ";

/// Raw text extracted for one event, with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    pub event_id: EventId,

    /// Page the content was extracted from
    pub source_url: String,

    /// When extraction finished
    pub extracted_at: DateTime<Utc>,

    /// Free-form extracted text (never empty once persisted)
    pub content: String,
}

impl EventDetail {
    pub fn new(event_id: EventId, source_url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            event_id,
            source_url: source_url.into(),
            extracted_at: Utc::now(),
            content: content.into(),
        }
    }

    /// Render the on-disk text form.
    ///
    /// ```text
    /// Event URL: <url>
    /// Extracted on: <rfc3339>
    ///
    /// <content>
    /// ```
    pub fn to_document(&self) -> String {
        format!(
            "{}{}\n{}{}\n\n{}",
            URL_PREFIX,
            self.source_url,
            EXTRACTED_PREFIX,
            self.extracted_at.to_rfc3339(),
            self.content
        )
    }

    /// Parse the on-disk text form. Returns `None` if the header is malformed.
    pub fn from_document(event_id: EventId, document: &str) -> Option<Self> {
        let mut parts = document.splitn(4, '\n');

        let source_url = parts.next()?.strip_prefix(URL_PREFIX)?.trim().to_string();
        let extracted_at = parts.next()?.strip_prefix(EXTRACTED_PREFIX)?.trim();
        let extracted_at = DateTime::parse_from_rfc3339(extracted_at)
            .ok()?
            .with_timezone(&Utc);

        if !parts.next()?.trim().is_empty() {
            return None;
        }
        let content = parts.next().unwrap_or_default().to_string();

        Some(Self {
            event_id,
            source_url,
            extracted_at,
            content,
        })
    }
}

/// Spoken-style digest of an event's detail text.
///
/// Computed on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub event_id: EventId,

    #[serde(rename = "summary")]
    pub text: String,
}

impl Summary {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A synthesized audio summary stored for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceClip {
    pub event_id: EventId,

    /// Voice the clip was rendered with
    pub voice_id: String,

    /// Where the audio bytes live (file path for the file store)
    pub audio_reference: String,

    /// Stored size; always greater than zero for a successful clip
    pub size_bytes: u64,
}
