//! Event types for the spedup ingestion pipeline
//!
//! Every stage of a batch run reports progress by emitting an [`IngestEvent`]
//! on the [`EventBus`]. The UI layer (the CLI presenter) is the subscriber;
//! no stage keeps progress in shared mutable state.

mod job_types;

pub use job_types::{JobStatus, SkipReason};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Ingestion pipeline events
///
/// Events are broadcast via EventBus and serialize to tagged JSON so they can
/// be forwarded to other front-ends unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IngestEvent {
    /// "Upload all" started
    BatchStarted {
        batch_id: Uuid,
        /// Number of files selected by the operator
        file_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A file's run started (duplicate check, scan, upload)
    FileStarted {
        batch_id: Uuid,
        file_name: String,
        /// 0-based position in the batch
        index: usize,
        total: usize,
        size_bytes: u64,
    },

    /// Scan window processed
    ScanProgress {
        file_name: String,
        bytes_scanned: u64,
        bytes_total: u64,
        lines_scanned: u64,
        lines_retained: u64,
    },

    /// Filtering finished for a file
    ScanCompleted {
        file_name: String,
        lines_scanned: u64,
        lines_retained: u64,
        source_bytes: u64,
        filtered_bytes: u64,
    },

    /// The server already holds an import for this taxpayer and period
    DuplicateDetected {
        file_name: String,
        cnpj: String,
        period_start: String,
        message: String,
    },

    /// Chunk acknowledged by the server
    UploadProgress {
        file_name: String,
        chunk_index: usize,
        total_chunks: usize,
        /// Percentage complete (0.0 - 100.0)
        percentage: f64,
        bytes_uploaded: u64,
        bytes_total: u64,
        /// Average throughput since the upload of this file began
        speed_bytes_per_sec: f64,
        /// Estimated remaining time, None while speed is unknown
        remaining_seconds: Option<u64>,
    },

    /// Last chunk acknowledged
    FileUploaded {
        file_name: String,
        job_id: Option<String>,
        detected_lines: Option<u64>,
    },

    /// File produced no job without an error
    FileSkipped {
        file_name: String,
        reason: SkipReason,
    },

    /// File failed; the batch continues with the next file
    FileFailed {
        file_name: String,
        error: String,
    },

    /// Waiting for server-side processing, emitted once per poll
    JobsPolled {
        batch_id: Uuid,
        tick: u32,
        terminal: usize,
        total: usize,
    },

    /// A batch job changed status between two polls
    JobStatusChanged {
        job_id: String,
        filename: String,
        status: JobStatus,
        message: Option<String>,
    },

    /// Every job of the batch reached a terminal status
    BatchJobsTerminal {
        batch_id: Uuid,
        completed: usize,
        errored: usize,
    },

    /// Job polling stopped because the bearer token was rejected
    AuthenticationRequired { batch_id: Uuid },

    /// Consolidated views refreshed
    ConsolidationCompleted { timestamp: DateTime<Utc> },

    /// Consolidation failed; imports are intact but views may be stale
    ConsolidationFailed { error: String },

    /// "Upload all" finished
    BatchFinished {
        batch_id: Uuid,
        jobs_created: usize,
        files_skipped: usize,
        files_failed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl IngestEvent {
    /// Event type name as serialized in the `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            IngestEvent::BatchStarted { .. } => "BatchStarted",
            IngestEvent::FileStarted { .. } => "FileStarted",
            IngestEvent::ScanProgress { .. } => "ScanProgress",
            IngestEvent::ScanCompleted { .. } => "ScanCompleted",
            IngestEvent::DuplicateDetected { .. } => "DuplicateDetected",
            IngestEvent::UploadProgress { .. } => "UploadProgress",
            IngestEvent::FileUploaded { .. } => "FileUploaded",
            IngestEvent::FileSkipped { .. } => "FileSkipped",
            IngestEvent::FileFailed { .. } => "FileFailed",
            IngestEvent::JobsPolled { .. } => "JobsPolled",
            IngestEvent::JobStatusChanged { .. } => "JobStatusChanged",
            IngestEvent::BatchJobsTerminal { .. } => "BatchJobsTerminal",
            IngestEvent::AuthenticationRequired { .. } => "AuthenticationRequired",
            IngestEvent::ConsolidationCompleted { .. } => "ConsolidationCompleted",
            IngestEvent::ConsolidationFailed { .. } => "ConsolidationFailed",
            IngestEvent::BatchFinished { .. } => "BatchFinished",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for pipeline events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (a slow presenter never stalls an upload)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// # Examples
///
/// ```
/// use spedup_common::events::{EventBus, IngestEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(IngestEvent::ConsolidationFailed { error: "locked".to_string() });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "ConsolidationFailed");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IngestEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IngestEvent,
    ) -> Result<usize, broadcast::error::SendError<IngestEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress events are informational; the pipeline never depends on a
    /// subscriber being present.
    pub fn emit_lossy(&self, event: IngestEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
