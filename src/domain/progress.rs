//! Per-event progress reconstructed from the stage journal.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::{Stage, StageEvent, StageEventType};
use super::record::EventId;

/// Where an event sits in the enrichment pipeline.
///
/// Only moves forward; a failing later stage never rolls it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    NoDetail,
    Detailed,
    Summarized,
    Voiced,
}

impl PipelineState {
    /// State reached once `stage` has produced its artifact
    pub fn after(stage: Stage) -> Self {
        match stage {
            Stage::Detail => PipelineState::Detailed,
            Stage::Summary => PipelineState::Summarized,
            Stage::Voice => PipelineState::Voiced,
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::NoDetail
    }
}

/// Last observed status of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Running,
    Completed,
    Skipped,
    Failed,
}

/// Progress of one event through the stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventProgress {
    pub event_id: EventId,

    pub state: PipelineState,

    /// Latest status per stage
    pub stages: HashMap<Stage, StageStatus>,

    /// Most recent error per stage, cleared on the next success
    pub last_errors: HashMap<Stage, String>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl EventProgress {
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            state: PipelineState::NoDetail,
            stages: HashMap::new(),
            last_errors: HashMap::new(),
            updated_at: None,
        }
    }

    /// Replay journal entries in order
    pub fn from_events(event_id: EventId, events: &[StageEvent]) -> Self {
        let mut progress = Self::new(event_id);
        for event in events {
            progress.apply_event(event);
        }
        progress
    }

    pub fn apply_event(&mut self, event: &StageEvent) {
        self.updated_at = Some(event.timestamp);

        match event.event_type {
            StageEventType::StageStarted => {
                self.stages.insert(event.stage, StageStatus::Running);
            }
            StageEventType::StageCompleted | StageEventType::StageSkipped => {
                let status = if event.event_type == StageEventType::StageSkipped {
                    StageStatus::Skipped
                } else {
                    StageStatus::Completed
                };
                self.stages.insert(event.stage, status);
                self.last_errors.remove(&event.stage);
                self.state = self.state.max(PipelineState::after(event.stage));
            }
            StageEventType::StageFailed => {
                self.stages.insert(event.stage, StageStatus::Failed);
                self.last_errors
                    .insert(event.stage, event.error.clone().unwrap_or_default());
            }
        }
    }

    pub fn has_reached(&self, state: PipelineState) -> bool {
        self.state >= state
    }
}
