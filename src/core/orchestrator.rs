//! Main orchestrator for the enrichment pipeline.
//!
//! Owns the collaborators and stores, journals every stage run, and exposes
//! the entry points callers use. Entry points are total: each returns a
//! [`StageOutcome`] and never an error or panic.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::adapters::{
    http_client, ChatToolAdapter, SpeechAdapter, StreamingSpeechAdapter, ToolAdapter, ToolSet,
    WebFetchTool,
};
use crate::config::{paths, ResolvedConfig};
use crate::domain::{
    normalize_event_url, EventDetail, EventId, EventListSnapshot, EventProgress, EventRecord, PipelineState,
    StageError, StageEvent, StageOutcome, StageResult, Summary, VoiceClip,
};
use crate::source::{EventSource, JsonLdEventSource};
use crate::store::{DetailStore, FileStore, FreshnessStore, VoiceStore};

use super::journal::Journal;
use super::locks::KeyLocks;

/// Every store the pipeline persists to
pub struct PipelineStores {
    pub freshness: FreshnessStore,
    pub details: DetailStore,
    pub voices: VoiceStore,
    pub journal: Journal,
}

impl PipelineStores {
    /// Open the canonical layout under `home`
    pub async fn open(home: &Path, ttl: Duration) -> Result<Self> {
        let snapshots = FileStore::open(paths::snapshot_dir(home), paths::SNAPSHOT_EXTENSION)
            .await
            .context("Failed to open snapshot store")?;
        let details = FileStore::open(paths::details_dir(home), paths::DETAIL_EXTENSION)
            .await
            .context("Failed to open detail store")?;
        let voices = FileStore::open(paths::voice_dir(home), paths::VOICE_EXTENSION)
            .await
            .context("Failed to open voice store")?;
        let journal = Journal::open(paths::journal_dir(home)).await?;

        Ok(Self {
            freshness: FreshnessStore::with_ttl(Arc::new(snapshots), ttl),
            details: DetailStore::new(Arc::new(details)),
            voices: VoiceStore::new(Arc::new(voices)),
            journal,
        })
    }
}

/// Result of the detail stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailResponse {
    pub event_data: EventDetail,

    /// True when served from the store without external calls
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMatch {
    pub event_id: EventId,
    pub event: EventRecord,
}

/// Journal-derived progress plus what the stores actually hold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStatus {
    #[serde(flatten)]
    pub progress: EventProgress,
    pub has_detail: bool,
    pub has_voice: bool,
}

/// Artifacts produced by an explicit detail → summary → voice run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub event_id: EventId,
    pub detail: DetailResponse,
    pub summary: Summary,
    pub voice: VoiceClip,
}

/// Main pipeline orchestrator
pub struct Orchestrator {
    pub(crate) source: Option<Arc<dyn EventSource>>,
    pub(crate) llm: Arc<dyn ToolAdapter>,
    pub(crate) speech: Arc<dyn SpeechAdapter>,
    pub(crate) tools: ToolSet,
    pub(crate) freshness: FreshnessStore,
    pub(crate) details: DetailStore,
    pub(crate) voices: VoiceStore,
    pub(crate) journal: Journal,
    pub(crate) locks: KeyLocks,
}

impl Orchestrator {
    /// Create an orchestrator without an event source; listing operations
    /// report a configuration error until one is attached.
    pub fn new(
        llm: Arc<dyn ToolAdapter>,
        speech: Arc<dyn SpeechAdapter>,
        tools: ToolSet,
        stores: PipelineStores,
    ) -> Self {
        Self {
            source: None,
            llm,
            speech,
            tools,
            freshness: stores.freshness,
            details: stores.details,
            voices: stores.voices,
            journal: stores.journal,
            locks: KeyLocks::new(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build every collaborator from resolved configuration
    pub async fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let client = http_client(StdDuration::from_secs(config.http_timeout_seconds))?;

        let llm = ChatToolAdapter::new(
            &config.llm.endpoint,
            &config.llm.model,
            config.llm.api_key.clone(),
            client.clone(),
        );
        let speech = StreamingSpeechAdapter::new(
            &config.speech.endpoint,
            config.speech.api_key.clone(),
            config.speech.user_id.clone(),
            &config.speech.voice_id,
            client.clone(),
        );
        let tools: ToolSet = vec![Arc::new(WebFetchTool::new(client.clone()))];

        let stores = PipelineStores::open(&config.home, Duration::hours(config.ttl_hours)).await?;
        let orchestrator = Self::new(Arc::new(llm), Arc::new(speech), tools, stores);

        Ok(match &config.source_url {
            Some(url) => orchestrator.with_source(Arc::new(JsonLdEventSource::new(url, client))),
            None => orchestrator,
        })
    }

    fn source(&self) -> StageResult<&dyn EventSource> {
        self.source.as_deref().ok_or_else(|| {
            StageError::Configuration(
                "No event source configured (set EVENTSONAR_SOURCE_URL or source.url)".to_string(),
            )
        })
    }

    /// Append to the journal; failures are logged and never fail the stage
    pub(crate) async fn record(&self, event: StageEvent) {
        if let Err(e) = self.journal.append(&event).await {
            warn!(
                event_id = %event.event_id,
                stage = %event.stage,
                error = %format!("{:#}", e),
                "Failed to write journal entry"
            );
        }
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// The event list, refreshed first when missing or stale
    #[instrument(skip(self))]
    pub async fn list_events(&self) -> StageOutcome<EventListSnapshot> {
        let result = match self.source() {
            Ok(source) => self.freshness.current(source).await,
            Err(e) => Err(e),
        };
        log_outcome("list_events", &result);
        result.into()
    }

    /// Scrape unconditionally and replace the snapshot
    #[instrument(skip(self))]
    pub async fn refresh_events(&self) -> StageOutcome<EventListSnapshot> {
        let result = match self.source() {
            Ok(source) => self.freshness.refresh(source).await,
            Err(e) => Err(e),
        };
        log_outcome("refresh_events", &result);
        result.into()
    }

    /// Events whose title, hosts or location contain `query`
    #[instrument(skip(self))]
    pub async fn search_events(&self, query: &str) -> StageOutcome<SearchResults> {
        let result = self.search(query).await;
        log_outcome("search_events", &result);
        result.into()
    }

    async fn search(&self, query: &str) -> StageResult<SearchResults> {
        let snapshot = self.freshness.current(self.source()?).await?;
        let events = snapshot.search(query).into_iter().cloned().collect();
        Ok(SearchResults {
            query: query.to_string(),
            events,
        })
    }

    /// First event matching `query` that has a usable identifier
    #[instrument(skip(self))]
    pub async fn find_event(&self, query: &str) -> StageOutcome<EventMatch> {
        let result = self.find(query).await;
        log_outcome("find_event", &result);
        result.into()
    }

    async fn find(&self, query: &str) -> StageResult<EventMatch> {
        let results = self.search(query).await?;
        results
            .events
            .into_iter()
            .find_map(|event| event.event_id().map(|event_id| EventMatch { event_id, event }))
            .ok_or_else(|| StageError::NotFound(format!("No event matches '{}'", query)))
    }

    /// Detail stage, keyed by the identifier derived from `event_url`
    #[instrument(skip(self))]
    pub async fn request_detail(&self, event_url: &str, force: bool) -> StageOutcome<DetailResponse> {
        let result = match parse_event_url(event_url) {
            Ok((event_id, event_url)) => self.ensure_detail(&event_id, &event_url, force).await,
            Err(e) => Err(e),
        };
        log_outcome("request_detail", &result);
        result.into()
    }

    #[instrument(skip(self))]
    pub async fn request_summary(&self, event_id: &str) -> StageOutcome<Summary> {
        let result = match EventId::new(event_id) {
            Ok(event_id) => self.summarize(&event_id).await,
            Err(e) => Err(e.into()),
        };
        log_outcome("request_summary", &result);
        result.into()
    }

    #[instrument(skip(self, summary_text))]
    pub async fn request_voice(&self, event_id: &str, summary_text: &str) -> StageOutcome<VoiceClip> {
        let result = match EventId::new(event_id) {
            Ok(event_id) => self.synthesize(&event_id, summary_text).await,
            Err(e) => Err(e.into()),
        };
        log_outcome("request_voice", &result);
        result.into()
    }

    /// The stored clip for an event
    #[instrument(skip(self))]
    pub async fn audio(&self, event_id: &str) -> StageOutcome<VoiceClip> {
        let result = self.lookup_audio(event_id).await;
        log_outcome("audio", &result);
        result.into()
    }

    async fn lookup_audio(&self, event_id: &str) -> StageResult<VoiceClip> {
        let event_id = EventId::new(event_id)?;
        let size = self
            .voices
            .size(&event_id)
            .await
            .map_err(StageError::transport)?;

        match size {
            Some(size_bytes) if size_bytes > 0 => Ok(VoiceClip {
                audio_reference: self.voices.reference(&event_id),
                voice_id: self.speech.voice_id().to_string(),
                event_id,
                size_bytes,
            }),
            _ => Err(StageError::NotFound(format!("Audio not found for ID: {}", event_id))),
        }
    }

    /// Progress from the journal, floored by the artifacts on disk
    #[instrument(skip(self))]
    pub async fn status(&self, event_id: &str) -> StageOutcome<EventStatus> {
        let result = self.event_status(event_id).await;
        log_outcome("status", &result);
        result.into()
    }

    async fn event_status(&self, event_id: &str) -> StageResult<EventStatus> {
        let event_id = EventId::new(event_id)?;

        let mut progress = self
            .journal
            .progress(&event_id)
            .await
            .map_err(StageError::transport)?;
        let has_detail = self
            .details
            .load(&event_id)
            .await
            .map_err(StageError::transport)?
            .is_some();
        let has_voice = self
            .voices
            .size(&event_id)
            .await
            .map_err(StageError::transport)?
            .is_some_and(|size| size > 0);

        if has_detail {
            progress.state = progress.state.max(PipelineState::Detailed);
        }
        if has_voice {
            progress.state = progress.state.max(PipelineState::Voiced);
        }

        Ok(EventStatus {
            progress,
            has_detail,
            has_voice,
        })
    }

    /// Run detail, summary and voice in order, stopping at the first failure
    #[instrument(skip(self))]
    pub async fn run_all(&self, event_url: &str, force: bool) -> StageOutcome<PipelineReport> {
        let result = self.run_stages(event_url, force).await;
        log_outcome("run_all", &result);
        result.into()
    }

    async fn run_stages(&self, event_url: &str, force: bool) -> StageResult<PipelineReport> {
        let (event_id, event_url) = parse_event_url(event_url)?;

        let detail = self
            .ensure_detail(&event_id, &event_url, force)
            .await
            .map_err(|e| prefixed("detail", e))?;
        let summary = self
            .summarize(&event_id)
            .await
            .map_err(|e| prefixed("summary", e))?;
        let voice = self
            .synthesize(&event_id, &summary.text)
            .await
            .map_err(|e| prefixed("voice", e))?;

        info!(%event_id, "Pipeline run completed");
        Ok(PipelineReport {
            event_id,
            detail,
            summary,
            voice,
        })
    }
}

/// Canonical URL and the identifier derived from it
fn parse_event_url(raw: &str) -> StageResult<(EventId, String)> {
    let event_url = normalize_event_url(raw)?;
    let event_id = EventId::from_url(&event_url)?;
    Ok((event_id, event_url))
}

/// Name the failing stage in the message, keeping the kind
fn prefixed(stage: &str, err: StageError) -> StageError {
    let message = format!("{} stage failed: {}", stage, err);
    match err {
        StageError::Configuration(_) => StageError::Configuration(message),
        StageError::NotFound(_) => StageError::NotFound(message),
        StageError::Transport(_) => StageError::Transport(message),
        StageError::CorruptState(_) => StageError::CorruptState(message),
    }
}

fn log_outcome<T>(operation: &str, result: &StageResult<T>) {
    if let Err(e) = result {
        match e {
            StageError::Transport(_) | StageError::CorruptState(_) => {
                error!(operation, kind = ?e.kind(), error = %e, "Operation failed")
            }
            StageError::Configuration(_) | StageError::NotFound(_) => {
                warn!(operation, kind = ?e.kind(), error = %e, "Operation rejected")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[test]
    fn test_prefixed_keeps_kind() {
        let err = prefixed("summary", StageError::NotFound("Event details not found".to_string()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "summary stage failed: Event details not found");
    }

    #[test]
    fn test_detail_response_shape() {
        let id = EventId::new("demo-night").unwrap();
        let response = DetailResponse {
            event_data: EventDetail::new(id, "https://lu.ma/demo-night", "Doors at 7"),
            cached: true,
        };
        let outcome: StageOutcome<DetailResponse> = Ok(response).into();

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["cached"], true);
        assert_eq!(value["event_data"]["content"], "Doors at 7");
    }
}
