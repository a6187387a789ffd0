//! Pipeline Integration Tests
//!
//! Drives the orchestrator entry points with counting doubles: stage
//! caching, ordering preconditions, fallback extraction, and the voice
//! post-condition.

mod common;

use std::sync::Arc;

use common::{event, harness, MockLlm, MockSource, MockSpeech, VOICE_ID};
use eventsonar::domain::{ErrorKind, EventId, PipelineState, Stage, StageStatus};
use eventsonar::StageOutcome;

const EVENT_URL: &str = "https://lu.ma/demo-night";

fn id() -> EventId {
    EventId::new("demo-night").unwrap()
}

// ============================================================================
// Detail stage
// ============================================================================

#[tokio::test]
async fn test_detail_is_extracted_once() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night: doors at 7pm, Friday."]),
        MockSpeech::new(Vec::new()),
    )
    .await;

    let first = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    let second = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.event_data.content, second.event_data.content);
    assert_eq!(h.llm.total_calls(), 1);
}

#[tokio::test]
async fn test_forced_detail_re_extracts() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night details"]),
        MockSpeech::new(Vec::new()),
    )
    .await;

    h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    let forced = h.orchestrator.request_detail(EVENT_URL, true).await.success().unwrap();

    assert!(!forced.cached);
    assert_eq!(h.llm.tool_calls(), 2);
}

#[tokio::test]
async fn test_longest_tool_output_wins() {
    let longest = "Demo Night at the Garage. Doors 7pm Friday. Hosted by Builders Club.";
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night", longest, "Demo Night at the Garage"]),
        MockSpeech::new(Vec::new()),
    )
    .await;

    let response = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();

    assert_eq!(response.event_data.content, longest);
    assert_eq!(h.llm.completions(), 0);
}

#[tokio::test]
async fn test_fallback_completion_is_persisted_exactly() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_completion("Event XYZ happens Friday"),
        MockSpeech::new(Vec::new()),
    )
    .await;

    let response = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    assert_eq!(response.event_data.content, "Event XYZ happens Friday");
    assert_eq!(h.llm.tool_calls(), 1);
    assert_eq!(h.llm.completions(), 1);

    // Read back through the store on the next call
    let cached = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    assert!(cached.cached);
    assert_eq!(cached.event_data.content, "Event XYZ happens Friday");
    assert_eq!(cached.event_data.source_url, EVENT_URL);

    let on_disk = std::fs::read_to_string(h.temp.path().join("details/demo-night.txt")).unwrap();
    assert!(on_disk.starts_with(&format!("Event URL: {}\nExtracted on: ", EVENT_URL)));
    assert!(on_disk.ends_with("\n\nEvent XYZ happens Friday"));
}

#[tokio::test]
async fn test_tool_error_falls_back_to_completion() {
    let mut llm = MockLlm::with_completion("Described without tools");
    llm.tool_error = true;
    let h = harness(MockSource::new(Vec::new()), llm, MockSpeech::new(Vec::new())).await;

    let response = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    assert_eq!(response.event_data.content, "Described without tools");
}

#[tokio::test]
async fn test_extraction_failure_is_transport_and_writes_nothing() {
    let h = harness(MockSource::new(Vec::new()), MockLlm::new(), MockSpeech::new(Vec::new())).await;

    let outcome = h.orchestrator.request_detail(EVENT_URL, false).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Transport));
    assert!(!h.temp.path().join("details/demo-night.txt").exists());

    let status = h.orchestrator.status("demo-night").await.success().unwrap();
    assert_eq!(status.progress.state, PipelineState::NoDetail);
    assert_eq!(status.progress.stages[&Stage::Detail], StageStatus::Failed);
}

#[tokio::test]
async fn test_detail_url_without_id_is_configuration_error() {
    let h = harness(MockSource::new(Vec::new()), MockLlm::new(), MockSpeech::new(Vec::new())).await;

    let outcome = h.orchestrator.request_detail("https://lu.ma/", false).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Configuration));
    assert_eq!(h.llm.total_calls(), 0);
}

#[tokio::test]
async fn test_detail_url_is_normalized_before_storing() {
    let mut llm = MockLlm::with_tool_outputs(&["Demo Night at the Garage, Friday 7pm."]);
    llm.completion = Some("Join Builders Club at the Garage this Friday.".to_string());
    let h = harness(MockSource::new(Vec::new()), llm, MockSpeech::new(Vec::new())).await;

    let first = h
        .orchestrator
        .request_detail("  https://lu.ma/demo-night\n", false)
        .await
        .success()
        .unwrap();
    let second = h
        .orchestrator
        .request_detail("https://lu.ma/demo-night\r\n", false)
        .await
        .success()
        .unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.event_data.source_url, EVENT_URL);
    assert_eq!(h.llm.tool_calls(), 1);

    let summary = h.orchestrator.request_summary("demo-night").await;
    assert!(summary.is_success());
}

#[tokio::test]
async fn test_detail_url_with_embedded_control_character_is_rejected() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night details"]),
        MockSpeech::new(Vec::new()),
    )
    .await;

    let outcome = h.orchestrator.request_detail("https://lu.ma/demo\nnight", false).await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Configuration));
    assert_eq!(h.llm.total_calls(), 0);
}

#[tokio::test]
async fn test_corrupt_detail_file_is_re_extracted() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night details"]),
        MockSpeech::new(Vec::new()),
    )
    .await;

    let path = h.temp.path().join("details/demo-night.txt");
    std::fs::write(&path, "garbage without a header").unwrap();

    let response = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    assert!(!response.cached);
    assert_eq!(h.llm.tool_calls(), 1);

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(on_disk.starts_with(&format!("Event URL: {}\n", EVENT_URL)));
    assert!(on_disk.ends_with("\n\nDemo Night details"));

    let again = h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    assert!(again.cached);
    assert_eq!(h.llm.tool_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_detail_requests_call_once() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night details"]),
        MockSpeech::new(Vec::new()),
    )
    .await;
    let orchestrator = Arc::new(h.orchestrator);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.request_detail(EVENT_URL, false).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_success());
    }

    assert_eq!(h.llm.tool_calls(), 1);
}

// ============================================================================
// Summary stage
// ============================================================================

#[tokio::test]
async fn test_summary_without_detail_is_not_found() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_completion("should never be used"),
        MockSpeech::new(Vec::new()),
    )
    .await;

    let outcome = h.orchestrator.request_summary("demo-night").await;
    match outcome {
        StageOutcome::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::NotFound);
            assert_eq!(message, "Event details not found for ID: demo-night");
        }
        StageOutcome::Success(_) => panic!("summary must not succeed without detail"),
    }
    assert_eq!(h.llm.total_calls(), 0);
}

#[tokio::test]
async fn test_summary_uses_stored_detail() {
    let mut llm = MockLlm::with_tool_outputs(&["Demo Night at the Garage, Friday 7pm."]);
    llm.completion = Some("  Join Builders Club at the Garage this Friday.  ".to_string());
    let h = harness(MockSource::new(Vec::new()), llm, MockSpeech::new(Vec::new())).await;

    h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    let summary = h.orchestrator.request_summary("demo-night").await.success().unwrap();

    assert_eq!(summary.event_id, id());
    assert_eq!(summary.text, "Join Builders Club at the Garage this Friday.");

    let prompts = h.llm.prompts.lock().unwrap();
    assert!(prompts.last().unwrap().contains("Demo Night at the Garage, Friday 7pm."));
}

#[tokio::test]
async fn test_summary_failure_is_returned_once() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night details"]),
        MockSpeech::new(Vec::new()),
    )
    .await;

    h.orchestrator.request_detail(EVENT_URL, false).await.success().unwrap();
    let outcome = h.orchestrator.request_summary("demo-night").await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Transport));
    assert_eq!(h.llm.completions(), 1);
}

// ============================================================================
// Voice stage
// ============================================================================

#[tokio::test]
async fn test_voice_clip_is_stored() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::new(),
        MockSpeech::new(vec![b"RIFF".to_vec(), vec![0u8; 60]]),
    )
    .await;

    let clip = h
        .orchestrator
        .request_voice("demo-night", "Join us Friday")
        .await
        .success()
        .unwrap();

    assert_eq!(clip.size_bytes, 64);
    assert_eq!(clip.voice_id, VOICE_ID);
    let bytes = std::fs::read(&clip.audio_reference).unwrap();
    assert_eq!(&bytes[..4], b"RIFF");

    let audio = h.orchestrator.audio("demo-night").await.success().unwrap();
    assert_eq!(audio.size_bytes, 64);
}

#[tokio::test]
async fn test_zero_byte_clip_is_transport_error() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::new(),
        MockSpeech::new(vec![Vec::new()]),
    )
    .await;

    let outcome = h.orchestrator.request_voice("demo-night", "Join us Friday").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Transport));
    assert!(!h.temp.path().join("voice/demo-night.wav").exists());

    let audio = h.orchestrator.audio("demo-night").await;
    assert_eq!(audio.error_kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_empty_regeneration_keeps_previous_clip() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::new(),
        MockSpeech::new(vec![Vec::new()]),
    )
    .await;

    let path = h.temp.path().join("voice/demo-night.wav");
    std::fs::write(&path, b"RIFF012345").unwrap();

    let outcome = h.orchestrator.request_voice("demo-night", "Join us Friday").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Transport));
    assert_eq!(h.speech.calls(), 1);

    assert_eq!(std::fs::read(&path).unwrap(), b"RIFF012345");
    let audio = h.orchestrator.audio("demo-night").await.success().unwrap();
    assert_eq!(audio.size_bytes, 10);
}

#[tokio::test]
async fn test_missing_speech_credentials_is_configuration_error() {
    let h = harness(MockSource::new(Vec::new()), MockLlm::new(), MockSpeech::without_credentials()).await;

    let outcome = h.orchestrator.request_voice("demo-night", "Join us Friday").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Configuration));
}

#[tokio::test]
async fn test_empty_summary_text_is_rejected_before_synthesis() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::new(),
        MockSpeech::new(vec![vec![1, 2, 3]]),
    )
    .await;

    let outcome = h.orchestrator.request_voice("demo-night", "   ").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Configuration));

    let outcome = h.orchestrator.request_voice("", "Join us").await;
    assert_eq!(outcome.error_kind(), Some(ErrorKind::Configuration));

    assert_eq!(h.speech.calls(), 0);
}

// ============================================================================
// Full run and status
// ============================================================================

#[tokio::test]
async fn test_run_all_reaches_voiced() {
    let mut llm = MockLlm::with_tool_outputs(&["Demo Night at the Garage, Friday 7pm."]);
    llm.completion = Some("Join Builders Club at the Garage this Friday.".to_string());
    let h = harness(MockSource::new(Vec::new()), llm, MockSpeech::new(vec![vec![7u8; 32]])).await;

    let report = h.orchestrator.run_all(EVENT_URL, false).await.success().unwrap();
    assert_eq!(report.event_id, id());
    assert_eq!(report.summary.text, "Join Builders Club at the Garage this Friday.");
    assert_eq!(report.voice.size_bytes, 32);

    let status = h.orchestrator.status("demo-night").await.success().unwrap();
    assert_eq!(status.progress.state, PipelineState::Voiced);
    assert!(status.has_detail);
    assert!(status.has_voice);
}

#[tokio::test]
async fn test_run_all_stops_at_failing_stage() {
    let h = harness(
        MockSource::new(Vec::new()),
        MockLlm::with_tool_outputs(&["Demo Night details"]),
        MockSpeech::new(vec![vec![1u8]]),
    )
    .await;

    let outcome = h.orchestrator.run_all(EVENT_URL, false).await;
    match outcome {
        StageOutcome::Error { kind, message } => {
            assert_eq!(kind, ErrorKind::Transport);
            assert!(message.starts_with("summary stage failed"));
        }
        StageOutcome::Success(_) => panic!("summary has no completion scripted"),
    }
    assert_eq!(h.speech.calls(), 0);

    // Earlier artifacts survive a later failure
    let status = h.orchestrator.status("demo-night").await.success().unwrap();
    assert_eq!(status.progress.state, PipelineState::Detailed);
    assert!(status.progress.last_errors.contains_key(&Stage::Summary));
}
