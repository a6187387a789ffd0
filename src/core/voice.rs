//! Voice stage: stream synthesized speech into the voice store.

use tracing::{info, instrument, warn};

use crate::adapters::SpeechError;
use crate::domain::{EventId, Stage, StageError, StageResult, VoiceClip};

use super::journal::StageRun;
use super::orchestrator::Orchestrator;

impl From<SpeechError> for StageError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::MissingCredentials(_) => StageError::Configuration(err.to_string()),
            SpeechError::Provider(_) => StageError::Transport(err.to_string()),
        }
    }
}

impl Orchestrator {
    /// Render `summary_text` with the fixed voice and store the clip
    #[instrument(skip(self, summary_text), fields(event_id = %event_id))]
    pub async fn synthesize(&self, event_id: &EventId, summary_text: &str) -> StageResult<VoiceClip> {
        if summary_text.trim().is_empty() {
            return Err(StageError::Configuration(
                "Summary text is required for speech synthesis".to_string(),
            ));
        }

        let _guard = self.locks.acquire(&format!("voice:{}", event_id)).await;
        let run = StageRun::new(event_id, Stage::Voice, summary_text);

        self.record(run.started()).await;
        let result = self.render_clip(event_id, summary_text).await;

        match &result {
            Ok(clip) => {
                info!(bytes = clip.size_bytes, "Voice clip stored");
                self.record(run.completed(format!("Stored {} bytes", clip.size_bytes)))
                    .await;
            }
            Err(e) => self.record(run.failed(e)).await,
        }

        result
    }

    async fn render_clip(&self, event_id: &EventId, summary_text: &str) -> StageResult<VoiceClip> {
        let chunks = self.speech.synthesize(summary_text).await?;

        let written = self
            .voices
            .write_stream(event_id, chunks)
            .await
            .map_err(StageError::transport)?;

        // Size is checked on the stored artifact, not the byte count
        let stored = self
            .voices
            .size(event_id)
            .await
            .map_err(StageError::transport)?;

        match stored {
            Some(size_bytes) if size_bytes > 0 => Ok(VoiceClip {
                event_id: event_id.clone(),
                voice_id: self.speech.voice_id().to_string(),
                audio_reference: self.voices.reference(event_id),
                size_bytes,
            }),
            _ => {
                if let Err(e) = self.voices.remove(event_id).await {
                    warn!(%event_id, error = %format!("{:#}", e), "Failed to remove empty clip");
                }
                Err(StageError::Transport(format!(
                    "Speech synthesis produced no audio for {} ({} bytes received)",
                    event_id, written
                )))
            }
        }
    }
}
