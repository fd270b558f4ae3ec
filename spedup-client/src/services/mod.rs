//! Pipeline stages
//!
//! DuplicateGuard → RecordFilter → ChunkedUploader per file, driven by the
//! QueueOrchestrator; JobCompletionWaiter and the consolidation refresh run
//! once per batch.

pub mod chunked_uploader;
pub mod consolidation;
pub mod duplicate_guard;
pub mod job_waiter;
pub mod queue_orchestrator;
pub mod record_filter;

pub use chunked_uploader::{ChunkedUploader, Throughput, UploadOutcome};
pub use consolidation::{refresh_views, ConsolidationOutcome};
pub use duplicate_guard::{
    AssumeNo, AssumeYes, DuplicateGuard, DuplicateResolver, GuardDecision, HeaderLayout, LedgerHeader,
};
pub use job_waiter::{JobCompletionWaiter, Sleeper, TokioSleeper, WaitOutcome, WaiterState};
pub use queue_orchestrator::{BatchOptions, BatchReport, QueueOrchestrator};
pub use record_filter::{LineReassembler, RecordFilter, ScanStats};
