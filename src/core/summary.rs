//! Summary stage: compress stored detail into a short spoken-style script.
//!
//! Never triggers extraction itself and never retries; summaries are
//! returned to the caller, not persisted.

use tracing::{info, instrument};

use crate::domain::{EventId, Stage, StageError, StageResult, Summary};

use super::journal::StageRun;
use super::orchestrator::Orchestrator;

const SUMMARY_INSTRUCTION: &str = "You are writing a script to be read aloud. Summarize the \
event below in an engaging, conversational tone in 50 to 60 words. Cover what the event is, \
when and where it happens, who is hosting or speaking, and why someone should attend. Reply \
with the script only, no headings or lists.";

fn summary_prompt(content: &str) -> String {
    format!("{}\n\nEvent details:\n{}", SUMMARY_INSTRUCTION, content)
}

impl Orchestrator {
    /// Summarize the stored detail for `event_id`
    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn summarize(&self, event_id: &EventId) -> StageResult<Summary> {
        let run = StageRun::new(event_id, Stage::Summary, event_id.as_str());

        let detail = match self.details.load(event_id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                let err =
                    StageError::NotFound(format!("Event details not found for ID: {}", event_id));
                self.record(run.failed(&err)).await;
                return Err(err);
            }
            Err(e) => {
                let err = StageError::transport(e);
                self.record(run.failed(&err)).await;
                return Err(err);
            }
        };

        // Keyed on the content being summarized
        let run = StageRun::new(event_id, Stage::Summary, &detail.content);
        self.record(run.started()).await;

        let result = self
            .llm
            .complete(&summary_prompt(&detail.content))
            .await
            .map_err(StageError::transport)
            .and_then(|output| {
                let text = output.content.trim().to_string();
                if text.is_empty() {
                    Err(StageError::Transport(format!(
                        "Summary generation returned no text for {}",
                        event_id
                    )))
                } else {
                    Ok(Summary {
                        event_id: event_id.clone(),
                        text,
                    })
                }
            });

        match &result {
            Ok(summary) => {
                info!(words = summary.word_count(), "Summary generated");
                self.record(run.completed(format!("{} words", summary.word_count())))
                    .await;
            }
            Err(e) => self.record(run.failed(e)).await,
        }

        result
    }
}
