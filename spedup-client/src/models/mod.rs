//! Data models for the ingestion pipeline
//!
//! - SourceFile / FilterResult: owned by one per-file run
//! - UploadSession: owned by the chunked uploader for one file
//! - ImportJob: read cache of server-owned job records
//! - BatchRun: owned by the queue orchestrator for one "upload all"

pub mod batch_run;
pub mod filter_result;
pub mod import_job;
pub mod source_file;
pub mod upload_session;

pub use batch_run::{BatchRun, FileOutcome};
pub use filter_result::FilterResult;
pub use import_job::{parse_job_listing, ImportJob};
pub use source_file::SourceFile;
pub use upload_session::UploadSession;
pub use spedup_common::events::{JobStatus, SkipReason};
