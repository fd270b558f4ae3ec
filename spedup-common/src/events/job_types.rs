//! Import job status types
//!
//! Shared between the event stream and the HTTP client so a job status read
//! from the server can be forwarded to subscribers unchanged.

use serde::{Deserialize, Serialize};

/// Server-side import job status
///
/// Transitions are one-directional: `pending → processing → completed|error`.
/// `Completed` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, waiting for a worker
    Pending,
    /// Being parsed and stored by the server
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Error,
}

impl JobStatus {
    /// Check if status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Position in the lifecycle, used to detect regressions
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Error => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Why a file of the batch produced no job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Operator declined to re-import an existing period
    DuplicateDeclined,
    /// Run was cancelled before the upload finished
    Cancelled,
}
