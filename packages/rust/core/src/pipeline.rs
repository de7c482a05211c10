//! Welcome and dropdown pipelines.
//!
//! Welcome: completion → append to `welcome.json`.
//! Dropdown: completion → append to `dropdown.json` → extract → materialize.
//!
//! Every step finishes before the next one starts. Nothing is retried and a
//! failure leaves earlier side effects in place (e.g. a dropdown completion
//! stays in its log even if extraction then fails).

use std::path::PathBuf;

use tracing::{info, instrument};

use genscribe_artifacts::{MaterializedBundle, extract_bundle, materialize};
use genscribe_completion::{Completion, CompletionRequest};
use genscribe_shared::{ChatMessage, OutputConfig, Result, RunId, Settings};
use genscribe_storage::LogStore;

/// Explicit dependencies of a pipeline run.
///
/// Built once in the entry point and handed to each pipeline; there is no
/// process-wide client or settings state.
pub struct PipelineContext<'a, C> {
    client: &'a C,
    settings: &'a Settings,
    output: OutputConfig,
}

impl<'a, C: Completion> PipelineContext<'a, C> {
    /// Context writing to the output locations named in `settings`.
    pub fn new(client: &'a C, settings: &'a Settings) -> Self {
        Self {
            client,
            settings,
            output: settings.output.clone(),
        }
    }

    /// Override the output locations.
    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Log store for the welcome pipeline.
    pub fn welcome_log(&self) -> LogStore {
        LogStore::new(self.output.welcome_log())
    }

    /// Log store for the dropdown pipeline.
    pub fn dropdown_log(&self) -> LogStore {
        LogStore::new(self.output.dropdown_log())
    }
}

/// Result of one welcome run.
#[derive(Debug, Clone)]
pub struct WelcomeOutcome {
    pub run_id: RunId,
    pub log_path: PathBuf,
    /// Log length after the append.
    pub log_len: usize,
}

/// Result of one dropdown run.
#[derive(Debug, Clone)]
pub struct DropdownOutcome {
    pub run_id: RunId,
    pub log_path: PathBuf,
    /// Log length after the append. `bundle.version` matches it unless
    /// that version directory was already taken.
    pub log_len: usize,
    pub bundle: MaterializedBundle,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a pipeline finishes successfully.
    fn finished(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn finished(&self) {}
}

/// Generate a welcome message and append it to the welcome log.
#[instrument(skip_all, fields(model = %ctx.settings.general.model))]
pub async fn run_welcome<C: Completion>(
    ctx: &PipelineContext<'_, C>,
    progress: &dyn ProgressReporter,
) -> Result<WelcomeOutcome> {
    let run_id = RunId::new();
    info!(%run_id, "starting welcome pipeline");

    progress.phase("Requesting welcome message");
    let request = CompletionRequest::new(
        &ctx.settings.general.model,
        ctx.settings.welcome_prompts.messages.clone(),
    )
    .with_response_format(ctx.settings.general.response_format.clone());
    let text = ctx.client.complete(&request).await?;

    progress.phase("Saving welcome message");
    let log = ctx.welcome_log();
    let log_len = log.append(&text)?;

    info!(%run_id, log_len, "welcome pipeline complete");
    progress.finished();

    Ok(WelcomeOutcome {
        run_id,
        log_path: log.path().to_path_buf(),
        log_len,
    })
}

/// Generate dropdown code, log it, and write it to a new version directory.
#[instrument(skip_all, fields(model = %ctx.settings.general.model))]
pub async fn run_dropdown<C: Completion>(
    ctx: &PipelineContext<'_, C>,
    progress: &dyn ProgressReporter,
) -> Result<DropdownOutcome> {
    let run_id = RunId::new();
    info!(%run_id, "starting dropdown pipeline");

    progress.phase("Requesting dropdown code");
    let prompts = &ctx.settings.code_prompts;
    let request = CompletionRequest::new(
        &ctx.settings.general.model,
        vec![
            ChatMessage::system(&prompts.system_persona),
            ChatMessage::user(&prompts.user_instruction),
        ],
    );
    let text = ctx.client.complete(&request).await?;

    progress.phase("Saving dropdown response");
    let log = ctx.dropdown_log();
    let log_len = log.append(&text)?;

    progress.phase("Extracting HTML and CSS");
    let bundle = extract_bundle(&text)?;

    progress.phase("Writing dropdown files");
    let materialized = materialize(&ctx.output.dropdowns_dir, &bundle, log_len)?;

    info!(
        %run_id,
        log_len,
        version = materialized.version,
        path = %materialized.dir.display(),
        "dropdown pipeline complete"
    );
    progress.finished();

    Ok(DropdownOutcome {
        run_id,
        log_path: log.path().to_path_buf(),
        log_len,
        bundle: materialized,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
