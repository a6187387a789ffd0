//! Test doubles shared by the integration tests.
//!
//! Each double counts its calls so tests can assert that cached paths make
//! no external call.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use futures_util::stream;
use tempfile::TempDir;

use eventsonar::adapters::{
    AdapterOutput, SpeechAdapter, SpeechError, Tool, ToolAdapter, ToolOutput, ToolSet,
};
use eventsonar::core::{Orchestrator, PipelineStores};
use eventsonar::domain::EventRecord;
use eventsonar::source::EventSource;
use eventsonar::store::ChunkStream;

pub const SOURCE_URL: &str = "https://lu.ma/sf";
pub const VOICE_ID: &str = "test-voice";

pub fn event(title: &str, slug: &str) -> EventRecord {
    EventRecord {
        title: title.to_string(),
        hosts: "Builders Club".to_string(),
        location: "San Francisco".to_string(),
        event_url: format!("https://lu.ma/{}", slug),
        ..EventRecord::default()
    }
}

/// Event source returning a fixed list, or failing
pub struct MockSource {
    pub events: Vec<EventRecord>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockSource {
    pub fn new(events: Vec<EventRecord>) -> Self {
        Self {
            events,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MockSource {
    fn source_url(&self) -> &str {
        SOURCE_URL
    }

    async fn fetch_events(&self) -> Result<Vec<EventRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("listing page unreachable");
        }
        Ok(self.events.clone())
    }
}

/// Language model double with scripted tool outputs and completion
pub struct MockLlm {
    pub tool_outputs: Vec<String>,
    pub tool_error: bool,
    pub completion: Option<String>,
    pub tool_calls: AtomicUsize,
    pub completions: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            tool_outputs: Vec::new(),
            tool_error: false,
            completion: None,
            tool_calls: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tool_outputs(outputs: &[&str]) -> Self {
        Self {
            tool_outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn with_completion(text: &str) -> Self {
        Self {
            completion: Some(text.to_string()),
            ..Self::new()
        }
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Every external call, tool run or completion
    pub fn total_calls(&self) -> usize {
        self.tool_calls() + self.completions()
    }
}

#[async_trait]
impl ToolAdapter for MockLlm {
    fn name(&self) -> &str {
        "mock-llm"
    }

    async fn run_with_tools(&self, prompt: &str, _tools: &[Arc<dyn Tool>]) -> Result<Vec<ToolOutput>> {
        self.tool_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.tool_error {
            anyhow::bail!("tool runtime unavailable");
        }
        Ok(self
            .tool_outputs
            .iter()
            .map(|content| ToolOutput {
                tool: "fetch_page".to_string(),
                content: content.clone(),
            })
            .collect())
    }

    async fn complete(&self, prompt: &str) -> Result<AdapterOutput> {
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.completion {
            Some(text) => Ok(AdapterOutput::new(text.clone())),
            None => anyhow::bail!("completion endpoint returned HTTP 503"),
        }
    }
}

/// Speech double emitting scripted chunks
pub struct MockSpeech {
    pub chunks: Vec<Vec<u8>>,
    pub missing_credentials: bool,
    pub calls: AtomicUsize,
}

impl MockSpeech {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks,
            missing_credentials: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn without_credentials() -> Self {
        Self {
            missing_credentials: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechAdapter for MockSpeech {
    fn name(&self) -> &str {
        "mock-speech"
    }

    fn voice_id(&self) -> &str {
        VOICE_ID
    }

    async fn synthesize(&self, _text: &str) -> Result<ChunkStream, SpeechError> {
        if self.missing_credentials {
            return Err(SpeechError::MissingCredentials("SPEECH_API_KEY is not set".to_string()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<Result<Vec<u8>>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub source: Arc<MockSource>,
    pub llm: Arc<MockLlm>,
    pub speech: Arc<MockSpeech>,
    pub temp: TempDir,
}

pub async fn harness(source: MockSource, llm: MockLlm, speech: MockSpeech) -> Harness {
    let temp = TempDir::new().unwrap();
    let stores = PipelineStores::open(temp.path(), Duration::hours(24))
        .await
        .unwrap();

    let source = Arc::new(source);
    let llm = Arc::new(llm);
    let speech = Arc::new(speech);
    let tools: ToolSet = Vec::new();

    let orchestrator = Orchestrator::new(llm.clone(), speech.clone(), tools, stores)
        .with_source(source.clone());

    Harness {
        orchestrator,
        source,
        llm,
        speech,
        temp,
    }
}
