//! End-to-end Pipeline Tests
//!
//! Drive the orchestrator through scripted text and render providers and
//! check the published state at each step.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::core::ai::{
    AIProvider, CompletionRequest, CompletionResponse, MockAIProvider, MockReply,
};
use crate::core::credentials::CredentialStore;
use crate::core::generative::{MockStatus, MockSubmit, MockVideoRenderProvider, VideoJobStatus};
use crate::core::pipeline::{PipelineOrchestrator, PipelineStage, PipelineState};
use crate::core::settings::PipelineSettings;
use crate::core::{CoreError, CoreResult, ErrorKind, GenerationRequest};

fn fast_settings(max_attempts: u32) -> PipelineSettings {
    let mut settings = PipelineSettings::default();
    settings.polling.interval_secs = 0;
    settings.polling.max_attempts = max_attempts;
    settings
}

fn influenza() -> GenerationRequest {
    GenerationRequest::new("Influenza", "fever, cough", "viral infection")
}

fn text_provider() -> Arc<MockAIProvider> {
    Arc::new(
        MockAIProvider::new("mock")
            .then_text("[narrator tone] Flu causes fever. (pause) Stay hydrated.")
            .then_text(r#"Sure! Here you go: ["lungs diagram", "thermometer", "rest icon"]"#),
    )
}

/// Text provider that snapshots the published pipeline state at the start
/// of every completion call
struct StateRecordingProvider {
    inner: MockAIProvider,
    state_rx: OnceLock<watch::Receiver<PipelineState>>,
    seen: Mutex<Vec<PipelineState>>,
}

impl StateRecordingProvider {
    fn new(inner: MockAIProvider) -> Self {
        Self {
            inner,
            state_rx: OnceLock::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn watch(&self, rx: watch::Receiver<PipelineState>) {
        let _ = self.state_rx.set(rx);
    }

    fn seen(&self) -> Vec<PipelineState> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AIProvider for StateRecordingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: CompletionRequest) -> CoreResult<CompletionResponse> {
        if let Some(rx) = self.state_rx.get() {
            let snapshot = rx.borrow().clone();
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(snapshot);
        }
        self.inner.complete(request).await
    }
}

#[tokio::test]
async fn test_full_run_completes() {
    let render = Arc::new(MockVideoRenderProvider::new().with_statuses([
        MockStatus::Pending,
        MockStatus::Pending,
        MockStatus::NotFound,
        MockStatus::Pending,
        MockStatus::Completed("https://x/video.mp4".to_string()),
    ]));
    let orchestrator =
        PipelineOrchestrator::new(text_provider(), render.clone(), &fast_settings(10));

    let outcome = orchestrator
        .run(influenza(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.video_url, "https://x/video.mp4");
    assert_eq!(outcome.script.cleaned, "Flu causes fever. Stay hydrated.");
    assert_eq!(outcome.visuals.len(), 3);
    assert_eq!(outcome.job.status, VideoJobStatus::Completed);
    assert_eq!(outcome.job.not_found_count, 1);

    let submitted = render.submissions();
    assert_eq!(submitted.len(), 1);
    let input = &submitted[0].video_inputs[0];
    assert_eq!(input.voice.input_text, "Flu causes fever. Stay hydrated.");
    assert_eq!(input.scenes[2].text, "rest icon");
    assert_eq!(input.scenes[2].position.y, 300);

    let state = orchestrator.state();
    assert_eq!(state.stage, PipelineStage::Done);
    assert_eq!(state.run_id.as_deref(), Some(outcome.run_id.as_str()));
    assert_eq!(state.video_url.as_deref(), Some("https://x/video.mp4"));
    assert!(!orchestrator.is_busy());
}

#[tokio::test]
async fn test_second_run_starts_from_clean_state() {
    let text = Arc::new(StateRecordingProvider::new(
        MockAIProvider::new("mock")
            .then_text("Flu causes fever.")
            .then_text(r#"["lungs diagram", "thermometer", "rest icon"]"#)
            .then_text("Migraine is a headache disorder.")
            .then_text(r#"["brain diagram", "dark room", "pain relief"]"#),
    ));
    let render = Arc::new(MockVideoRenderProvider::new().with_statuses([
        MockStatus::Completed("https://x/flu.mp4".to_string()),
        MockStatus::Completed("https://x/migraine.mp4".to_string()),
    ]));
    let orchestrator = PipelineOrchestrator::new(text.clone(), render, &fast_settings(3));
    text.watch(orchestrator.subscribe());

    let first = orchestrator
        .run(influenza(), &CancellationToken::new())
        .await
        .unwrap();
    let finished = orchestrator.state();
    assert_eq!(finished.stage, PipelineStage::Done);
    assert!(finished.script.is_some());
    assert_eq!(finished.visuals.len(), 3);
    assert!(finished.job.is_some());
    assert_eq!(finished.video_url.as_deref(), Some("https://x/flu.mp4"));

    let second = orchestrator
        .run(
            GenerationRequest::new("Migraine", "headache, nausea", "neurological"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(second.video_url, "https://x/migraine.mp4");

    // Script and visuals calls for each run
    let seen = text.seen();
    assert_eq!(seen.len(), 4);

    let at_first_call = &seen[2];
    assert_eq!(at_first_call.stage, PipelineStage::Scripting);
    assert_eq!(at_first_call.run_id.as_deref(), Some(second.run_id.as_str()));
    assert_ne!(at_first_call.run_id.as_deref(), Some(first.run_id.as_str()));
    assert!(at_first_call.script.is_none());
    assert!(at_first_call.visuals.is_empty());
    assert!(at_first_call.job.is_none());
    assert!(at_first_call.progress.is_none());
    assert!(at_first_call.video_url.is_none());
    assert!(at_first_call.error.is_none());

    // The visuals call already sees this run's script and nothing older
    let at_visuals_call = &seen[3];
    assert_eq!(at_visuals_call.stage, PipelineStage::Visualizing);
    assert_eq!(
        at_visuals_call.script.as_ref().map(|s| s.cleaned.as_str()),
        Some("Migraine is a headache disorder.")
    );
    assert!(at_visuals_call.visuals.is_empty());
    assert!(at_visuals_call.video_url.is_none());
}

#[tokio::test]
async fn test_second_run_replaces_previous_error() {
    let text = Arc::new(
        MockAIProvider::new("mock")
            .then(MockReply::Unauthorized)
            .then_text("Migraine is a headache disorder.")
            .then_text("no labels here"),
    );
    let render = Arc::new(
        MockVideoRenderProvider::new().with_submit(MockSubmit::Rejected("quota".to_string())),
    );
    let orchestrator = PipelineOrchestrator::new(text, render, &fast_settings(3));

    let first = orchestrator
        .run_to_state(influenza(), &CancellationToken::new())
        .await;
    assert_eq!(first.stage, PipelineStage::Errored);
    assert_eq!(
        first.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::AuthenticationFailure)
    );

    let second = orchestrator
        .run_to_state(
            GenerationRequest::new("Migraine", "headache, nausea", "neurological"),
            &CancellationToken::new(),
        )
        .await;

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(second.stage, PipelineStage::Errored);
    assert_eq!(
        second.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::TransportError)
    );
    assert_eq!(second.visuals[0].text, "Migraine diagram");
    assert!(second.video_url.is_none());
}

#[tokio::test]
async fn test_auth_failure_stops_before_render() {
    let text = Arc::new(MockAIProvider::new("mock").then(MockReply::Unauthorized));
    let render = Arc::new(MockVideoRenderProvider::new());
    let orchestrator = PipelineOrchestrator::new(text.clone(), render.clone(), &fast_settings(3));

    let err = orchestrator
        .run(influenza(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    assert_eq!(text.requests().len(), 1);
    assert!(render.submissions().is_empty());

    let state = orchestrator.state();
    assert_eq!(state.stage, PipelineStage::Errored);
    assert!(state.script.is_none());
    assert!(state.video_url.is_none());
}

#[tokio::test]
async fn test_visual_failure_never_aborts() {
    let text = Arc::new(
        MockAIProvider::new("mock")
            .then_text("Asthma narrows the airways.")
            .then(MockReply::Failure("upstream 503".to_string())),
    );
    let render = Arc::new(
        MockVideoRenderProvider::new()
            .with_statuses([MockStatus::Completed("https://x/asthma.mp4".to_string())]),
    );
    let orchestrator = PipelineOrchestrator::new(text, render.clone(), &fast_settings(3));

    let outcome = orchestrator
        .run(
            GenerationRequest::new("Asthma", "wheezing, cough", "chronic"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let labels: Vec<&str> = outcome.visuals.iter().map(|v| v.text.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Asthma diagram", "Symptom: wheezing", "Treatment options"]
    );
    assert_eq!(render.submissions()[0].video_inputs[0].scenes.len(), 3);
}

#[tokio::test]
async fn test_timeout_reports_no_video() {
    let render = Arc::new(MockVideoRenderProvider::new());
    let orchestrator = PipelineOrchestrator::new(text_provider(), render.clone(), &fast_settings(5));

    let err = orchestrator
        .run(influenza(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Timeout(_)));
    assert_eq!(render.status_query_count(), 5);

    let state = orchestrator.state();
    assert_eq!(state.stage, PipelineStage::Errored);
    assert_eq!(
        state.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::BudgetExhausted)
    );
    assert_eq!(
        state.job.as_ref().map(|j| j.status),
        Some(VideoJobStatus::TimedOut)
    );
    assert!(state.video_url.is_none());
}

#[tokio::test]
async fn test_render_failure_is_business_failure() {
    let render = Arc::new(MockVideoRenderProvider::new().with_statuses([
        MockStatus::Processing,
        MockStatus::Failed(Some("avatar unavailable".to_string())),
    ]));
    let orchestrator = PipelineOrchestrator::new(text_provider(), render, &fast_settings(10));

    let state = orchestrator
        .run_to_state(influenza(), &CancellationToken::new())
        .await;

    assert_eq!(state.stage, PipelineStage::Errored);
    let error = state.error.unwrap();
    assert_eq!(error.kind, ErrorKind::BusinessFailure);
    assert!(error.message.contains("avatar unavailable"));
}

#[tokio::test]
async fn test_blank_request_is_rejected_without_remote_calls() {
    let text = text_provider();
    let orchestrator = PipelineOrchestrator::new(
        text.clone(),
        Arc::new(MockVideoRenderProvider::new()),
        &fast_settings(3),
    );

    let err = orchestrator
        .run(
            GenerationRequest::new("Influenza", "  ", "viral"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(text.requests().is_empty());
}

#[tokio::test]
async fn test_concurrent_run_is_rejected_and_cancel_ends_active_run() {
    let mut settings = fast_settings(1000);
    settings.polling.interval_secs = 3600;
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        text_provider(),
        Arc::new(MockVideoRenderProvider::new()),
        &settings,
    ));
    let cancel = CancellationToken::new();

    let mut rx = orchestrator.subscribe();
    let active = {
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run(influenza(), &cancel).await })
    };

    let polling = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| state.stage == PipelineStage::Polling),
    )
    .await
    .expect("run should reach polling")
    .unwrap()
    .clone();
    assert!(orchestrator.is_busy());

    let rejected = orchestrator
        .run_to_state(influenza(), &CancellationToken::new())
        .await;
    assert_eq!(
        rejected.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Busy)
    );
    assert_eq!(orchestrator.state().run_id, polling.run_id);
    assert_eq!(orchestrator.state().stage, PipelineStage::Polling);

    cancel.cancel();
    let result = active.await.unwrap();

    assert!(matches!(result, Err(CoreError::Cancelled(_))));
    let state = orchestrator.state();
    assert_eq!(state.stage, PipelineStage::Errored);
    assert_eq!(
        state.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Cancelled)
    );
    assert!(!state.job.unwrap().is_terminal());
}

#[test]
fn test_from_settings_requires_both_keys() {
    let settings = PipelineSettings::default();

    let none = CredentialStore::resolve_with(&settings, |_| None);
    let err = PipelineOrchestrator::from_settings(&settings, &none)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::MissingCredential);
    assert!(err.to_string().contains("OPENROUTER_API_KEY"));

    let text_only = CredentialStore::resolve_with(&settings, |name| {
        (name == "OPENROUTER_API_KEY").then(|| "sk-or".to_string())
    });
    let err = PipelineOrchestrator::from_settings(&settings, &text_only)
        .err()
        .unwrap();
    assert!(err.to_string().contains("HEYGEN_API_KEY"));

    let both = CredentialStore::resolve_with(&settings, |_| Some("key".to_string()));
    assert!(PipelineOrchestrator::from_settings(&settings, &both).is_ok());
}
