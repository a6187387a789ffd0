//! Core orchestration logic.
//!
//! This module contains:
//! - Journal: Append-only stage journal per event
//! - KeyLocks: Per-key single-writer locks
//! - Orchestrator: Entry points and the detail, summary and voice stages

pub mod detail;
pub mod journal;
pub mod locks;
pub mod orchestrator;
pub mod summary;
pub mod voice;

// Re-export commonly used types
pub use detail::select_longest;
pub use journal::{generate_idempotency_key, hash_input, Journal, StageRun};
pub use locks::KeyLocks;
pub use orchestrator::{
    DetailResponse, EventMatch, EventStatus, Orchestrator, PipelineReport, PipelineStores,
    SearchResults,
};
