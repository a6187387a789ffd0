//! Append-only stage journal, one JSONL file per event.
//!
//! Progress is never stored directly; it is derived by replaying the journal.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::domain::{EventId, EventProgress, Stage, StageError, StageEvent, StageEventType};

/// Directory of `<event_id>.jsonl` files
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    /// Open (creating if needed) the journal directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create journal directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, event_id: &EventId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", event_id))
    }

    /// Append an entry to its event's journal
    pub async fn append(&self, event: &StageEvent) -> Result<()> {
        let path = self.path_for(&event.event_id);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open journal: {}", path.display()))?;

        let json = serde_json::to_string(event).context("Failed to serialize stage event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write stage event")?;
        file.flush().await.context("Failed to flush stage event")?;

        Ok(())
    }

    /// Replay an event's journal in order.
    ///
    /// Unparseable lines are logged and skipped.
    pub async fn replay(&self, event_id: &EventId) -> Result<Vec<StageEvent>> {
        let path = self.path_for(event_id);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open journal: {}", path.display()))
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StageEvent>(&line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(%event_id, error = %e, "Skipping corrupt journal line"),
            }
        }

        Ok(events)
    }

    /// Current progress of an event
    pub async fn progress(&self, event_id: &EventId) -> Result<EventProgress> {
        let events = self.replay(event_id).await?;
        Ok(EventProgress::from_events(event_id.clone(), &events))
    }
}

/// Journal entries for one execution of a stage, sharing an idempotency key
pub struct StageRun {
    event_id: EventId,
    stage: Stage,
    idempotency_key: String,
    started: Instant,
}

impl StageRun {
    pub fn new(event_id: &EventId, stage: Stage, input: &str) -> Self {
        Self {
            event_id: event_id.clone(),
            stage,
            idempotency_key: generate_idempotency_key(event_id, stage, input),
            started: Instant::now(),
        }
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    fn entry(&self, event_type: StageEventType, summary: String) -> StageEvent {
        StageEvent::new(
            self.event_id.clone(),
            self.stage,
            event_type,
            self.idempotency_key.clone(),
            summary,
        )
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn started(&self) -> StageEvent {
        self.entry(StageEventType::StageStarted, format!("{} started", self.stage))
    }

    pub fn skipped(&self, summary: impl Into<String>) -> StageEvent {
        self.entry(StageEventType::StageSkipped, summary.into())
            .with_duration(self.elapsed_ms())
    }

    pub fn completed(&self, summary: impl Into<String>) -> StageEvent {
        self.entry(StageEventType::StageCompleted, summary.into())
            .with_duration(self.elapsed_ms())
    }

    pub fn failed(&self, error: &StageError) -> StageEvent {
        self.entry(
            StageEventType::StageFailed,
            format!("{} failed ({:?})", self.stage, error.kind()),
        )
        .with_duration(self.elapsed_ms())
        .with_error(error.to_string())
    }
}

/// Idempotency key for a stage run: `{event_id}:{stage}:{input_hash}`
pub fn generate_idempotency_key(event_id: &EventId, stage: Stage, input: &str) -> String {
    format!("{}:{}:{}", event_id, stage, hash_input(input))
}

/// First 16 hex chars of the input's SHA256
pub fn hash_input(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}
