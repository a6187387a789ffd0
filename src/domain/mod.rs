//! Domain types for the event pipeline.
//!
//! - Records: scraped events and their identifiers
//! - Snapshot: the cached event list
//! - Artifacts: stage outputs (detail, summary, voice)
//! - Events/Progress: the per-event stage journal and its replayed state
//! - Outcome: tagged stage results

pub mod artifact;
pub mod events;
pub mod outcome;
pub mod progress;
pub mod record;
pub mod snapshot;

// Re-export commonly used types
pub use artifact::{EventDetail, Summary, VoiceClip};
pub use events::{Stage, StageEvent, StageEventType};
pub use outcome::{ErrorKind, StageError, StageOutcome, StageResult};
pub use progress::{EventProgress, PipelineState, StageStatus};
pub use record::{normalize_event_url, EventId, EventRecord, InvalidEventId, NOT_FOUND};
pub use snapshot::{EventListSnapshot, DEFAULT_TTL_HOURS};
