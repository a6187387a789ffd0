//! Adapter interfaces for external systems.
//!
//! The pipeline only sees these traits; concrete clients are built from
//! configuration and passed in, so tests can substitute doubles.
//!
//! - [`ToolAdapter`]: language model with tool execution, plus plain completion
//! - [`SpeechAdapter`]: streaming text-to-speech

pub mod chat;
pub mod speech;
pub mod web_fetch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::store::ChunkStream;

pub use chat::ChatToolAdapter;
pub use speech::StreamingSpeechAdapter;
pub use web_fetch::WebFetchTool;

const USER_AGENT: &str = concat!("eventsonar/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client; the timeout here is the only one applied to external calls
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Output from a plain completion
#[derive(Debug, Clone)]
pub struct AdapterOutput {
    /// The text returned by the model
    pub content: String,
}

impl AdapterOutput {
    pub fn new(content: String) -> Self {
        Self { content }
    }
}

/// Function-style description of a tool, as sent to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,

    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// Text produced by one tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub tool: String,
    pub content: String,
}

/// A capability the model may invoke
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Run with model-supplied arguments
    async fn call(&self, arguments: &Value) -> Result<String>;
}

pub type ToolSet = Vec<Arc<dyn Tool>>;

/// Language model access used by the detail and summary stages
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Submit `prompt` with `tools` available and return every text the
    /// tools produced. An empty result means no tool ran successfully.
    async fn run_with_tools(&self, prompt: &str, tools: &[Arc<dyn Tool>]) -> Result<Vec<ToolOutput>>;

    /// Plain text completion, no tools
    async fn complete(&self, prompt: &str) -> Result<AdapterOutput>;
}

/// Why speech synthesis could not run
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech credentials missing: {0}")]
    MissingCredentials(String),

    #[error("Speech provider error: {0}")]
    Provider(String),
}

/// Streaming text-to-speech with a fixed voice
#[async_trait]
pub trait SpeechAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// The voice every clip is rendered with
    fn voice_id(&self) -> &str;

    /// Start synthesis; audio chunks arrive in playback order
    async fn synthesize(&self, text: &str) -> Result<ChunkStream, SpeechError>;
}
