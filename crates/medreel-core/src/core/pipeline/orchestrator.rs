//! Pipeline Orchestrator
//!
//! Runs script generation, visual suggestions, render submission and polling
//! in sequence, publishing a fresh [`PipelineState`] on every transition.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ulid::Ulid;

use super::state::{PipelineStage, PipelineState};
use crate::core::ai::{AIProvider, OpenRouterProvider, ProviderConfig};
use crate::core::credentials::{CredentialStore, CredentialType};
use crate::core::generative::{
    HeyGenProvider, PollingConfig, PollingController, VideoJob, VideoRenderProvider,
    VideoRequestBuilder,
};
use crate::core::script::{ScriptGenerator, ScriptResult};
use crate::core::settings::PipelineSettings;
use crate::core::visuals::{VisualElement, VisualElementGenerator};
use crate::core::{CoreError, CoreResult, GenerationRequest, RunId};

/// Everything a successful run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub run_id: RunId,
    pub script: ScriptResult,
    pub visuals: Vec<VisualElement>,
    pub job: VideoJob,
    pub video_url: String,
}

/// Sequences the generation stages for one run at a time
pub struct PipelineOrchestrator {
    script_generator: ScriptGenerator,
    visual_generator: VisualElementGenerator,
    request_builder: VideoRequestBuilder,
    render_provider: Arc<dyn VideoRenderProvider>,
    polling: PollingController,
    /// Held for the duration of a run
    run_guard: Mutex<()>,
    state_tx: watch::Sender<PipelineState>,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator over explicit providers
    pub fn new(
        text_provider: Arc<dyn AIProvider>,
        render_provider: Arc<dyn VideoRenderProvider>,
        settings: &PipelineSettings,
    ) -> Self {
        let text = &settings.text_generation;
        let (state_tx, _) = watch::channel(PipelineState::default());

        Self {
            script_generator: ScriptGenerator::new(Arc::clone(&text_provider))
                .with_max_tokens(text.script_max_tokens),
            visual_generator: VisualElementGenerator::new(text_provider)
                .with_max_tokens(text.visuals_max_tokens),
            request_builder: VideoRequestBuilder::new(&settings.video_render),
            polling: PollingController::new(
                Arc::clone(&render_provider),
                PollingConfig::from(&settings.polling),
            ),
            render_provider,
            run_guard: Mutex::new(()),
            state_tx,
        }
    }

    /// Creates an orchestrator backed by OpenRouter and HeyGen. Both keys
    /// must be present; nothing touches the network here.
    pub fn from_settings(
        settings: &PipelineSettings,
        credentials: &CredentialStore,
    ) -> CoreResult<Self> {
        let openrouter_key = credentials.require(CredentialType::OpenRouterApiKey)?;
        let heygen_key = credentials.require(CredentialType::HeyGenApiKey)?;

        let text_provider = OpenRouterProvider::new(ProviderConfig::from_settings(
            &openrouter_key,
            &settings.text_generation,
        ))?;
        let render_provider = HeyGenProvider::new(heygen_key, &settings.video_render)?;

        Ok(Self::new(
            Arc::new(text_provider),
            Arc::new(render_provider),
            settings,
        ))
    }

    /// Receives a snapshot on every state transition
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    /// Current state snapshot
    pub fn state(&self) -> PipelineState {
        self.state_tx.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state_tx.borrow().is_active()
    }

    /// Runs the whole pipeline for one request.
    ///
    /// Fails with [`CoreError::RunInProgress`] without touching state if
    /// another run is active. Otherwise the state is reset before the first
    /// remote call and ends in `Done` or `Errored`.
    pub async fn run(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> CoreResult<PipelineOutcome> {
        let _guard = self.run_guard.try_lock().map_err(|_| {
            warn!("Rejected pipeline run: another run is in progress");
            CoreError::RunInProgress
        })?;

        let run_id = Ulid::new().to_string();
        self.state_tx
            .send_replace(PipelineState::started(run_id.clone()));
        info!("Pipeline run {} started for '{}'", run_id, request.disease);

        match self.execute(&run_id, &request, cancel).await {
            Ok(outcome) => {
                info!("Pipeline run {} done: {}", run_id, outcome.video_url);
                Ok(outcome)
            }
            Err(e) => {
                warn!("Pipeline run {} failed ({}): {}", run_id, e.kind(), e);
                self.transition(|state| state.errored(&e));
                Err(e)
            }
        }
    }

    /// Runs the pipeline and returns the final state instead of a result.
    /// A rejected concurrent run yields a detached `Errored` state.
    pub async fn run_to_state(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> PipelineState {
        match self.run(request, cancel).await {
            Err(e @ CoreError::RunInProgress) => PipelineState::default().errored(&e),
            _ => self.state(),
        }
    }

    async fn execute(
        &self,
        run_id: &str,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> CoreResult<PipelineOutcome> {
        request.validate()?;

        let script = cancellable(
            cancel,
            PipelineStage::Scripting,
            self.script_generator.generate(request),
        )
        .await??;
        self.transition(|state| state.with_script(script.clone()));

        let visuals = cancellable(
            cancel,
            PipelineStage::Visualizing,
            self.visual_generator
                .generate(&request.disease, &request.symptoms),
        )
        .await?;
        self.transition(|state| state.with_visuals(visuals.clone()));

        let payload = self.request_builder.build(&script.cleaned, &visuals);
        let video_id = cancellable(
            cancel,
            PipelineStage::Submitting,
            self.render_provider.submit(&payload),
        )
        .await??;

        let mut job = VideoJob::new(video_id);
        let max_attempts = self.polling.config().max_attempts;
        self.transition(|state| state.polling(job.clone(), max_attempts));
        info!(
            "Run {} polling {} video {} (up to {} checks)",
            run_id,
            self.render_provider.name(),
            job.id,
            max_attempts
        );

        let video_url = self
            .polling
            .poll_with_progress(&mut job, cancel, |job| {
                self.transition(|state| state.with_job_progress(job.clone()))
            })
            .await?;

        self.transition(|state| state.done(job.clone(), video_url.clone()));

        Ok(PipelineOutcome {
            run_id: run_id.to_string(),
            script,
            visuals,
            job,
            video_url,
        })
    }

    fn transition(&self, next: impl FnOnce(PipelineState) -> PipelineState) {
        self.state_tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = next(current);
        });
    }
}

/// Races a stage future against cancellation
async fn cancellable<T>(
    cancel: &CancellationToken,
    stage: PipelineStage,
    future: impl Future<Output = T>,
) -> CoreResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CoreError::Cancelled(format!("Run cancelled while {}", stage))),
        value = future => Ok(value),
    }
}
