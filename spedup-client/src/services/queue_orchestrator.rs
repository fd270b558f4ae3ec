//! Batch ("upload all") orchestration
//!
//! Files are processed strictly one after another: duplicate check, scan,
//! then chunked upload. A failing file is reported and the batch moves on.
//! Once every file was handled, the jobs created by the batch are awaited
//! and the consolidated views refreshed.

use crate::api::IngestApi;
use crate::error::{ClientError, ClientResult};
use crate::models::{BatchRun, FileOutcome, SkipReason, SourceFile};
use chrono::Utc;
use spedup_common::config::PipelineConfig;
use spedup_common::events::{EventBus, IngestEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::chunked_uploader::ChunkedUploader;
use super::consolidation::{self, ConsolidationOutcome};
use super::duplicate_guard::{AssumeNo, DuplicateGuard, DuplicateResolver, GuardDecision, HeaderLayout};
use super::job_waiter::{JobCompletionWaiter, Sleeper, TokioSleeper, WaitOutcome};
use super::record_filter::RecordFilter;

/// Stage switches for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub check_duplicates: bool,
    pub wait_for_jobs: bool,
    /// Only effective when waiting
    pub consolidate: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            check_duplicates: true,
            wait_for_jobs: true,
            consolidate: true,
        }
    }
}

/// Everything a finished batch produced
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch: BatchRun,
    /// None when no job was created or waiting was disabled
    pub wait: Option<WaitOutcome>,
    pub consolidation: Option<ConsolidationOutcome>,
}

impl BatchReport {
    pub fn authentication_required(&self) -> bool {
        matches!(self.wait, Some(WaitOutcome::AuthenticationRequired))
    }
}

/// Drives a batch of ledger files through the pipeline
pub struct QueueOrchestrator {
    api: Arc<dyn IngestApi>,
    events: EventBus,
    filter: RecordFilter,
    guard: DuplicateGuard,
    uploader: ChunkedUploader,
    poll_interval: Duration,
    max_poll_ticks: Option<u32>,
    sleeper: Arc<dyn Sleeper>,
    options: BatchOptions,
}

impl QueueOrchestrator {
    /// Build an orchestrator from pipeline settings
    ///
    /// Known duplicates are skipped unless a different resolver is set.
    pub fn new(api: Arc<dyn IngestApi>, events: EventBus, pipeline: &PipelineConfig) -> Self {
        Self {
            api,
            events,
            filter: RecordFilter::new(&pipeline.allowed_records, pipeline.scan_window_bytes),
            guard: DuplicateGuard::new(
                HeaderLayout::default(),
                pipeline.header_probe_bytes,
                Arc::new(AssumeNo),
            ),
            uploader: ChunkedUploader::new(pipeline.upload_chunk_bytes, None),
            poll_interval: pipeline.poll_interval(),
            max_poll_ticks: pipeline.max_poll_ticks,
            sleeper: Arc::new(TokioSleeper),
            options: BatchOptions::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn DuplicateResolver>) -> Self {
        self.guard = DuplicateGuard::new(self.guard.layout().clone(), self.guard.probe_bytes(), resolver);
        self
    }

    pub fn with_company_id(mut self, company_id: Option<String>) -> Self {
        self.uploader = ChunkedUploader::new(self.uploader.chunk_size(), company_id);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run a whole batch
    ///
    /// Never fails as a whole: per-file errors end up in the outcomes,
    /// authentication and timeouts in the wait outcome.
    pub async fn run(&self, files: Vec<PathBuf>, cancel: &CancellationToken) -> BatchReport {
        let mut batch = BatchRun::new(files);
        let total = batch.files.len();

        tracing::info!(batch_id = %batch.batch_id, files = total, "Starting batch");
        self.events.emit_lossy(IngestEvent::BatchStarted {
            batch_id: batch.batch_id,
            file_count: total,
            timestamp: Utc::now(),
        });

        for index in 0..total {
            let path = batch.files[index].clone();
            let outcome = match self.process_file(&path, batch.batch_id, index, total, cancel).await {
                Ok(outcome) => outcome,
                Err(ClientError::Cancelled) => FileOutcome::Skipped(SkipReason::Cancelled),
                Err(e) => {
                    tracing::error!(
                        batch_id = %batch.batch_id,
                        file = %path.display(),
                        error = %e,
                        "File failed, continuing with next file"
                    );
                    self.events.emit_lossy(IngestEvent::FileFailed {
                        file_name: display_name(&path),
                        error: e.to_string(),
                    });
                    FileOutcome::Failed { error: e.to_string() }
                }
            };

            if let FileOutcome::Skipped(reason) = &outcome {
                self.events.emit_lossy(IngestEvent::FileSkipped {
                    file_name: display_name(&path),
                    reason: reason.clone(),
                });
            }
            batch.record(outcome);
        }

        let mut report = BatchReport {
            batch,
            wait: None,
            consolidation: None,
        };

        if !report.batch.has_jobs() {
            tracing::info!(batch_id = %report.batch.batch_id, "No jobs created, batch finished");
        } else if self.options.wait_for_jobs && !cancel.is_cancelled() {
            let mut waiter =
                JobCompletionWaiter::new(self.poll_interval, self.max_poll_ticks, self.sleeper.clone());
            let outcome = waiter
                .wait(
                    self.api.as_ref(),
                    report.batch.batch_id,
                    &report.batch.job_ids,
                    &self.events,
                    cancel,
                )
                .await;

            if matches!(outcome, WaitOutcome::Done { .. }) {
                report.batch.complete = true;
                if self.options.consolidate {
                    report.consolidation =
                        Some(consolidation::refresh_views(self.api.as_ref(), &self.events, cancel).await);
                }
            }
            report.wait = Some(outcome);
        }

        tracing::info!(
            batch_id = %report.batch.batch_id,
            jobs_created = report.batch.job_ids.len(),
            files_skipped = report.batch.skipped_count(),
            files_failed = report.batch.failed_count(),
            complete = report.batch.complete,
            "Batch finished"
        );
        self.events.emit_lossy(IngestEvent::BatchFinished {
            batch_id: report.batch.batch_id,
            jobs_created: report.batch.job_ids.len(),
            files_skipped: report.batch.skipped_count(),
            files_failed: report.batch.failed_count(),
            timestamp: Utc::now(),
        });

        report
    }

    /// Duplicate check, scan and upload of one file
    pub async fn process_file(
        &self,
        path: &Path,
        batch_id: Uuid,
        index: usize,
        total: usize,
        cancel: &CancellationToken,
    ) -> ClientResult<FileOutcome> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let file = SourceFile::open(path).await?;

        tracing::info!(batch_id = %batch_id, file = %file.name, index, total, size = file.size, "Processing file");
        self.events.emit_lossy(IngestEvent::FileStarted {
            batch_id,
            file_name: file.name.clone(),
            index,
            total,
            size_bytes: file.size,
        });

        if self.options.check_duplicates {
            let decision = self
                .guard
                .check(self.api.as_ref(), &file, &self.events, cancel)
                .await?;
            if decision == GuardDecision::Declined {
                return Ok(FileOutcome::Skipped(SkipReason::DuplicateDeclined));
            }
        }

        let filtered = self.filter.filter_file(&file, &self.events, cancel).await?;
        let upload = self
            .uploader
            .upload(self.api.as_ref(), &file.name, &filtered, &self.events, cancel)
            .await?;

        Ok(match upload.job_id {
            Some(job_id) => FileOutcome::Submitted { job_id },
            None => FileOutcome::UploadedWithoutJob,
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_run_every_stage() {
        let options = BatchOptions::default();
        assert!(options.check_duplicates);
        assert!(options.wait_for_jobs);
        assert!(options.consolidate);
    }

    #[test]
    fn test_display_name_uses_file_component() {
        assert_eq!(display_name(Path::new("/data/efd/jan.txt")), "jan.txt");
    }
}
