//! MedReel command-line interface
//!
//! Generates a narrated medical explainer video from the terminal and prints
//! the resulting video URL.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use medreel_core::core::credentials::CredentialStore;
use medreel_core::core::settings::{PipelineSettings, SettingsManager};
use medreel_core::{
    CoreError, GenerationRequest, PipelineOrchestrator, PipelineStage, PipelineState,
};

#[derive(Parser)]
#[command(name = "medreel", version, about = "Narrated medical explainer video generator")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a video for one condition
    Generate {
        /// Condition name
        #[arg(long)]
        disease: String,

        /// Comma-separated symptoms
        #[arg(long)]
        symptoms: String,

        /// Free-text description
        #[arg(long)]
        description: String,

        /// Status checks before giving up
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Seconds between status checks
        #[arg(long)]
        poll_interval_secs: Option<u64>,

        /// Print the outcome (or final state on failure) as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective settings as JSON
    Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let manager = match &cli.settings {
        Some(path) => SettingsManager::at_path(path),
        None => SettingsManager::default_location()
            .context("Failed to locate the settings directory")?,
    };

    match cli.command {
        Command::Generate {
            disease,
            symptoms,
            description,
            max_attempts,
            poll_interval_secs,
            json,
        } => {
            let mut settings = manager.load();
            if let Some(max_attempts) = max_attempts {
                settings.polling.max_attempts = max_attempts;
            }
            if let Some(interval) = poll_interval_secs {
                settings.polling.interval_secs = interval;
            }
            settings.normalize();

            let request = GenerationRequest::new(disease, symptoms, description);
            generate(&settings, request, json).await
        }
        Command::Settings => {
            let settings = manager
                .try_load()
                .with_context(|| format!("Failed to load {}", manager.path().display()))?;
            println!("{}", serde_json::to_string_pretty(&redacted(settings))?);
            Ok(())
        }
    }
}

async fn generate(settings: &PipelineSettings, request: GenerationRequest, json: bool) -> Result<()> {
    let credentials = CredentialStore::from_env(settings);
    let orchestrator = Arc::new(
        PipelineOrchestrator::from_settings(settings, &credentials)
            .context("Failed to set up the generation pipeline")?,
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling the run");
                cancel.cancel();
            }
        });
    }

    if !json {
        tokio::spawn(report_progress(orchestrator.subscribe()));
    }

    match orchestrator.run(request, &cancel).await {
        Ok(outcome) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.video_url);
            }
            Ok(())
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&orchestrator.state())?);
            }
            Err(run_error(e))
        }
    }
}

fn run_error(e: CoreError) -> anyhow::Error {
    anyhow::Error::new(e).context("Pipeline run failed")
}

/// Prints one line per stage change and per status check
async fn report_progress(mut rx: watch::Receiver<PipelineState>) {
    let mut last: Option<(PipelineStage, u32)> = None;

    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        let attempt = state.progress.map(|p| p.attempt).unwrap_or(0);
        if last == Some((state.stage, attempt)) {
            continue;
        }
        last = Some((state.stage, attempt));

        match (state.stage, state.progress) {
            (PipelineStage::Polling, Some(progress)) if progress.attempt > 0 => {
                let status = state
                    .job
                    .as_ref()
                    .map(|job| job.status.to_string())
                    .unwrap_or_default();
                eprintln!(
                    "polling: check {}/{} ({})",
                    progress.attempt, progress.max_attempts, status
                );
            }
            (stage, _) => eprintln!("{}", stage),
        }
    }
}

fn redacted(mut settings: PipelineSettings) -> PipelineSettings {
    for key in [
        &mut settings.text_generation.api_key,
        &mut settings.video_render.api_key,
    ] {
        if key.is_some() {
            *key = Some("<redacted>".to_string());
        }
    }
    settings
}
