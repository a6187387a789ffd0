//! eventsonar - Staged event content pipeline
//!
//! Scrapes a public event-listing page and enriches each event through
//! explicit stages: detail extraction, spoken-style summary, and speech
//! synthesis.
//!
//! # Architecture
//!
//! - The event list is cached as a single snapshot with a 24 hour TTL
//! - Each stage persists its artifact per event and reuses it until forced
//! - Stage runs are recorded as immutable journal events; progress is
//!   derived by replaying them
//! - Every entry point returns a tagged success/error outcome
//!
//! # Modules
//!
//! - `adapters`: External system integrations (chat model, tools, speech)
//! - `core`: Orchestration logic (Orchestrator, stages, Journal, KeyLocks)
//! - `domain`: Data structures (EventRecord, artifacts, StageOutcome)
//! - `source`: Event-listing scraper
//! - `store`: Key-value persistence (snapshot, detail, voice)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List events (scrapes when stale)
//! eventsonar events
//!
//! # Enrich one event end to end
//! eventsonar run https://lu.ma/demo-night
//!
//! # Check its progress
//! eventsonar status demo-night
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod source;
pub mod store;

// Re-export main types at crate root for convenience
pub use core::{Orchestrator, PipelineStores};
pub use domain::{
    ErrorKind, EventDetail, EventId, EventListSnapshot, EventRecord, StageError, StageOutcome,
    Summary, VoiceClip,
};
