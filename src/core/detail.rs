//! Detail stage: extract an event page's text once and keep it.
//!
//! A stored detail has no TTL; it is reused until a caller forces
//! regeneration.

use tracing::{debug, info, instrument, warn};

use crate::adapters::{web_fetch, ToolOutput};
use crate::domain::{EventDetail, EventId, Stage, StageError, StageResult};

use super::journal::StageRun;
use super::orchestrator::{DetailResponse, Orchestrator};

fn extraction_prompt(event_url: &str) -> String {
    format!(
        "Use the {tool} tool to retrieve {url} and extract all of the text that describes \
         the event: title, date and time, location, hosts, speakers, agenda, pricing and \
         registration details. Return the extracted text only.",
        tool = web_fetch::TOOL_NAME,
        url = event_url
    )
}

fn fallback_prompt(event_url: &str) -> String {
    format!(
        "Describe the event at {} in as much detail as you can: what it is, when and where \
         it takes place, who is hosting it and who it is for.",
        event_url
    )
}

/// The longest non-blank tool output; the earliest wins a tie
pub fn select_longest(outputs: &[ToolOutput]) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;

    for output in outputs {
        if output.content.trim().is_empty() {
            continue;
        }
        let len = output.content.chars().count();
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((output.content.as_str(), len));
        }
    }

    best.map(|(content, _)| content)
}

impl Orchestrator {
    /// Return the stored detail for `event_id`, extracting it from
    /// `event_url` on a miss or when `force` is set.
    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn ensure_detail(
        &self,
        event_id: &EventId,
        event_url: &str,
        force: bool,
    ) -> StageResult<DetailResponse> {
        let _guard = self.locks.acquire(&format!("detail:{}", event_id)).await;
        let run = StageRun::new(event_id, Stage::Detail, event_url);

        if !force {
            if let Some(detail) = self.cached_detail(event_id).await {
                debug!("Detail already stored, skipping extraction");
                self.record(run.skipped("Served stored detail")).await;
                return Ok(DetailResponse {
                    event_data: detail,
                    cached: true,
                });
            }
        }

        self.record(run.started()).await;
        let result = self.extract_detail(event_id, event_url).await;

        match &result {
            Ok(detail) => {
                info!(chars = detail.content.len(), "Detail extracted");
                self.record(run.completed(format!("Extracted {} chars", detail.content.len())))
                    .await;
            }
            Err(e) => self.record(run.failed(e)).await,
        }

        result.map(|detail| DetailResponse {
            event_data: detail,
            cached: false,
        })
    }

    /// Stored detail, treating read errors the same as a miss
    async fn cached_detail(&self, event_id: &EventId) -> Option<EventDetail> {
        match self.details.load(event_id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(%event_id, error = %format!("{:#}", e), "Failed to read stored detail, re-extracting");
                None
            }
        }
    }

    async fn extract_detail(&self, event_id: &EventId, event_url: &str) -> StageResult<EventDetail> {
        let from_tools = match self
            .llm
            .run_with_tools(&extraction_prompt(event_url), &self.tools)
            .await
        {
            Ok(outputs) => {
                debug!(outputs = outputs.len(), "Tool run finished");
                select_longest(&outputs).map(str::to_string)
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Tool run failed, falling back to plain completion");
                None
            }
        };

        let content = match from_tools {
            Some(content) => content,
            None => {
                info!(adapter = self.llm.name(), "No tool output, using plain completion");
                self.llm
                    .complete(&fallback_prompt(event_url))
                    .await
                    .map_err(StageError::transport)?
                    .content
            }
        };

        if content.trim().is_empty() {
            return Err(StageError::Transport(format!(
                "Extraction produced no content for {}",
                event_url
            )));
        }

        let detail = EventDetail::new(event_id.clone(), event_url, content);
        self.details.save(&detail).await.map_err(StageError::transport)?;

        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(content: &str) -> ToolOutput {
        ToolOutput {
            tool: web_fetch::TOOL_NAME.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_select_longest_picks_longest() {
        let outputs = vec![output("short"), output("the longest output"), output("medium one")];
        assert_eq!(select_longest(&outputs), Some("the longest output"));
    }

    #[test]
    fn test_select_longest_tie_keeps_first() {
        let outputs = vec![output("aaaa"), output("bbbb")];
        assert_eq!(select_longest(&outputs), Some("aaaa"));
    }

    #[test]
    fn test_select_longest_ignores_blank() {
        assert_eq!(select_longest(&[output("   \n\t  ")]), None);
        assert_eq!(select_longest(&[]), None);
        assert_eq!(select_longest(&[output("        "), output("x")]), Some("x"));
    }

    #[test]
    fn test_prompts_mention_url() {
        let url = "https://lu.ma/demo-night";
        assert!(extraction_prompt(url).contains(url));
        assert!(extraction_prompt(url).contains(web_fetch::TOOL_NAME));
        assert!(fallback_prompt(url).contains(url));
    }
}
