//! Subcommand execution

use super::args::{Command, UploadArgs};
use super::{discovery, presenter, prompt::TerminalResolver};
use crate::api::{HttpIngestApi, IngestApi};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{FileOutcome, SourceFile};
use crate::services::{
    AssumeYes, BatchOptions, DuplicateResolver, QueueOrchestrator, RecordFilter, WaitOutcome,
};
use anyhow::{bail, Context, Result};
use spedup_common::config::PipelineConfig;
use spedup_common::events::EventBus;
use spedup_common::human_time::{format_bytes, format_elapsed};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-subscriber event buffer of the CLI bus
const EVENT_CAPACITY: usize = 256;

/// How a command ended, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// At least one file or job failed, or the wait gave up
    Failure,
    /// The server rejected the bearer token
    AuthenticationRequired,
}

impl CommandOutcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            CommandOutcome::Success => ExitCode::SUCCESS,
            CommandOutcome::Failure => ExitCode::from(1),
            CommandOutcome::AuthenticationRequired => ExitCode::from(2),
        }
    }
}

/// Run a command that needs the server
pub async fn run_remote(
    command: Command,
    config: ClientConfig,
    cancel: CancellationToken,
) -> Result<CommandOutcome> {
    let api = Arc::new(
        HttpIngestApi::new(&config.server_url, config.token.clone())
            .context("Failed to build HTTP client")?,
    );

    let result = match command {
        Command::Upload(upload) => return upload_batch(api, upload, &config, &cancel).await,
        Command::Jobs => list_jobs(api.as_ref(), &cancel).await,
        Command::Cancel { job_id } => api.cancel_job(&job_id, &cancel).await.map(|()| {
            println!("Cancel requested for job {} (advisory)", job_id);
        }),
        Command::RefreshViews => api.refresh_views(&cancel).await.map(|()| {
            println!("Consolidated views refreshed");
        }),
        Command::Filter { .. } => bail!("filter runs locally"),
    };

    match result {
        Ok(()) => Ok(CommandOutcome::Success),
        Err(e) if e.is_auth_failure() => {
            eprintln!("Authentication required: {}", e);
            Ok(CommandOutcome::AuthenticationRequired)
        }
        Err(e) => Err(e.into()),
    }
}

async fn list_jobs(api: &dyn IngestApi, cancel: &CancellationToken) -> Result<(), ClientError> {
    let jobs = api.list_jobs(cancel).await?;
    if jobs.is_empty() {
        println!("No import jobs");
        return Ok(());
    }

    println!("{:<38} {:<11} {:<20} FILE", "ID", "STATUS", "UPDATED");
    for job in jobs {
        println!(
            "{:<38} {:<11} {:<20} {}{}",
            job.id,
            job.status.to_string(),
            job.updated_at.as_deref().unwrap_or("-"),
            job.filename,
            job.message.map(|m| format!("  ({})", m)).unwrap_or_default()
        );
    }
    Ok(())
}

async fn upload_batch(
    api: Arc<HttpIngestApi>,
    upload: UploadArgs,
    config: &ClientConfig,
    cancel: &CancellationToken,
) -> Result<CommandOutcome> {
    let files = discovery::discover_ledgers(&upload.paths)?;
    if files.is_empty() {
        bail!("No ledger files found");
    }

    let resolver: Arc<dyn DuplicateResolver> = if upload.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalResolver)
    };
    let options = BatchOptions {
        check_duplicates: !upload.skip_duplicate_check,
        wait_for_jobs: !upload.no_wait,
        consolidate: !upload.no_consolidate,
    };

    let events = EventBus::new(EVENT_CAPACITY);
    let presenter = presenter::spawn(&events);

    let orchestrator = QueueOrchestrator::new(api, events, &config.pipeline)
        .with_resolver(resolver)
        .with_company_id(upload.company_id.or_else(|| config.company_id.clone()))
        .with_options(options);

    let started = Instant::now();
    let report = orchestrator.run(files, cancel).await;

    // Closing the bus ends the presenter
    drop(orchestrator);
    if let Err(e) = presenter.await {
        tracing::warn!(error = %e, "Presenter task failed");
    }

    tracing::info!(elapsed = %format_elapsed(started.elapsed()), "Upload command finished");

    if report.authentication_required() {
        return Ok(CommandOutcome::AuthenticationRequired);
    }

    let jobs_failed = match &report.wait {
        Some(WaitOutcome::Done { jobs }) => jobs.iter().any(|j| j.status == crate::models::JobStatus::Error),
        Some(WaitOutcome::TimedOut { .. }) | Some(WaitOutcome::Cancelled) => true,
        Some(WaitOutcome::AuthenticationRequired) | None => false,
    };
    let files_failed = report
        .batch
        .outcomes
        .iter()
        .any(|o| matches!(o, FileOutcome::Failed { .. }));

    if files_failed || jobs_failed || cancel.is_cancelled() {
        Ok(CommandOutcome::Failure)
    } else {
        Ok(CommandOutcome::Success)
    }
}

/// Filter a ledger locally and report the counters
pub async fn run_filter(
    input: &Path,
    output: Option<&Path>,
    pipeline: &PipelineConfig,
    cancel: CancellationToken,
) -> Result<CommandOutcome> {
    let file = SourceFile::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let filter = RecordFilter::new(&pipeline.allowed_records, pipeline.scan_window_bytes);
    let events = EventBus::new(EVENT_CAPACITY);
    let result = filter.filter_file(&file, &events, &cancel).await?;

    println!(
        "{}: {} records scanned, {} kept, {} -> {}",
        file.name,
        result.lines_scanned,
        result.lines_retained,
        format_bytes(file.size),
        format_bytes(result.filtered_len())
    );

    if let Some(output) = output {
        tokio::fs::write(output, &result.data)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Filtered payload written to {}", output.display());
    }

    Ok(CommandOutcome::Success)
}
