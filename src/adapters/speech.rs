//! Streaming text-to-speech over HTTP.
//!
//! Speaks the PlayHT-style streaming protocol: a JSON `POST` authenticated
//! with `AUTHORIZATION` and `X-USER-ID` headers, answered with a chunked
//! audio body.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::store::ChunkStream;

use super::{SpeechAdapter, SpeechError};

pub const DEFAULT_ENDPOINT: &str = "https://api.play.ht/api/v2/tts/stream";
pub const DEFAULT_VOICE_ID: &str =
    "s3://voice-cloning-zero-shot/d9ff78ba-d016-47f6-b0ef-dd630f59414e/female-cs/manifest.json";
pub const VOICE_ENGINE: &str = "Play3.0-mini";

pub struct StreamingSpeechAdapter {
    endpoint: String,
    api_key: Option<String>,
    user_id: Option<String>,
    voice_id: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice: &'a str,
    output_format: &'a str,
    voice_engine: &'a str,
}

impl StreamingSpeechAdapter {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        user_id: Option<String>,
        voice_id: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            user_id: user_id.filter(|u| !u.trim().is_empty()),
            voice_id: voice_id.into(),
            client,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), SpeechError> {
        match (&self.api_key, &self.user_id) {
            (Some(key), Some(user)) => Ok((key.as_str(), user.as_str())),
            (None, _) => Err(SpeechError::MissingCredentials(
                "SPEECH_API_KEY is not set".to_string(),
            )),
            (_, None) => Err(SpeechError::MissingCredentials(
                "SPEECH_USER_ID is not set".to_string(),
            )),
        }
    }
}

#[async_trait]
impl SpeechAdapter for StreamingSpeechAdapter {
    fn name(&self) -> &str {
        "streaming-tts"
    }

    fn voice_id(&self) -> &str {
        &self.voice_id
    }

    async fn synthesize(&self, text: &str) -> Result<ChunkStream, SpeechError> {
        let (api_key, user_id) = self.credentials()?;

        let body = SpeechRequest {
            text,
            voice: &self.voice_id,
            output_format: "wav",
            voice_engine: VOICE_ENGINE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("AUTHORIZATION", api_key)
            .header("X-USER-ID", user_id)
            .header("accept", "audio/wav")
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SpeechError::Provider(format!("HTTP {}: {}", status, detail.trim())));
        }

        debug!(endpoint = %self.endpoint, voice = %self.voice_id, "Speech stream opened");

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| anyhow::Error::new(e).context("Audio stream interrupted"))
            .boxed())
    }
}
