//! Terminal presenter
//!
//! The single subscriber of the event bus in the CLI. Turns pipeline events
//! into progress lines on stdout.

use spedup_common::events::{EventBus, IngestEvent, SkipReason};
use spedup_common::human_time::{format_bytes, format_eta, format_rate};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Render one event as a progress line
///
/// Returns None for events too chatty for the terminal.
pub fn render(event: &IngestEvent) -> Option<String> {
    let line = match event {
        IngestEvent::BatchStarted { file_count, .. } => {
            format!("Uploading {} file(s)", file_count)
        }
        IngestEvent::FileStarted {
            file_name,
            index,
            total,
            size_bytes,
            ..
        } => format!("[{}/{}] {} ({})", index + 1, total, file_name, format_bytes(*size_bytes)),
        IngestEvent::ScanProgress { .. } => return None,
        IngestEvent::ScanCompleted {
            lines_scanned,
            lines_retained,
            source_bytes,
            filtered_bytes,
            ..
        } => format!(
            "  scanned {} records, kept {} ({} -> {})",
            lines_scanned,
            lines_retained,
            format_bytes(*source_bytes),
            format_bytes(*filtered_bytes)
        ),
        IngestEvent::DuplicateDetected {
            cnpj, period_start, ..
        } => format!("  already imported: CNPJ {} from {}", cnpj, period_start),
        IngestEvent::UploadProgress {
            chunk_index,
            total_chunks,
            percentage,
            bytes_uploaded,
            bytes_total,
            speed_bytes_per_sec,
            remaining_seconds,
            ..
        } => format!(
            "  chunk {}/{} {:5.1}% {} / {} at {}, eta {}",
            chunk_index + 1,
            total_chunks,
            percentage,
            format_bytes(*bytes_uploaded),
            format_bytes(*bytes_total),
            format_rate(*speed_bytes_per_sec),
            format_eta(*remaining_seconds)
        ),
        IngestEvent::FileUploaded { job_id, .. } => match job_id {
            Some(id) => format!("  uploaded, job {}", id),
            None => "  uploaded, no job id returned".to_string(),
        },
        IngestEvent::FileSkipped { file_name, reason } => match reason {
            SkipReason::DuplicateDeclined => format!("  skipped {} (duplicate)", file_name),
            SkipReason::Cancelled => format!("  skipped {} (cancelled)", file_name),
        },
        IngestEvent::FileFailed { file_name, error } => format!("  FAILED {}: {}", file_name, error),
        IngestEvent::JobsPolled { terminal, total, .. } => {
            format!("Waiting for jobs: {}/{} finished", terminal, total)
        }
        IngestEvent::JobStatusChanged {
            job_id,
            filename,
            status,
            message,
        } => match message {
            Some(message) => format!("  job {} ({}): {} - {}", job_id, filename, status, message),
            None => format!("  job {} ({}): {}", job_id, filename, status),
        },
        IngestEvent::BatchJobsTerminal { completed, errored, .. } => {
            format!("All jobs finished: {} completed, {} with errors", completed, errored)
        }
        IngestEvent::AuthenticationRequired { .. } => {
            "Session expired or token rejected, please log in again".to_string()
        }
        IngestEvent::ConsolidationCompleted { .. } => "Consolidated views refreshed".to_string(),
        IngestEvent::ConsolidationFailed { error } => {
            format!("Warning: view refresh failed, results may be stale ({})", error)
        }
        IngestEvent::BatchFinished {
            jobs_created,
            files_skipped,
            files_failed,
            ..
        } => format!(
            "Done: {} job(s) created, {} skipped, {} failed",
            jobs_created, files_skipped, files_failed
        ),
    };
    Some(line)
}

/// Spawn the presenter task
///
/// Runs until every sender of the bus is dropped.
pub fn spawn(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(line) = render(&event) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Presenter lagged behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
