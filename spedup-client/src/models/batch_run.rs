//! State of one "upload all" operation

use spedup_common::events::SkipReason;
use std::path::PathBuf;
use uuid::Uuid;

/// How a single file of the batch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Uploaded; the server created a job
    Submitted { job_id: String },
    /// Uploaded, but the final response carried no job id
    UploadedWithoutJob,
    /// Clean skip, not an error
    Skipped(SkipReason),
    /// Per-file failure; the batch continued
    Failed { error: String },
}

/// Ordered batch of files plus the jobs they produced
#[derive(Debug, Clone)]
pub struct BatchRun {
    pub batch_id: Uuid,
    /// Files in the order selected by the operator
    pub files: Vec<PathBuf>,
    /// Outcome per processed file, parallel to `files`
    pub outcomes: Vec<FileOutcome>,
    /// Job ids created by this batch, in submission order
    pub job_ids: Vec<String>,
    /// Set once every job id is present in the server listing and terminal
    pub complete: bool,
}

impl BatchRun {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            files,
            outcomes: Vec::new(),
            job_ids: Vec::new(),
            complete: false,
        }
    }

    /// Record the outcome of the next file
    pub fn record(&mut self, outcome: FileOutcome) {
        if let FileOutcome::Submitted { job_id } = &outcome {
            if !self.job_ids.contains(job_id) {
                self.job_ids.push(job_id.clone());
            }
        }
        self.outcomes.push(outcome);
    }

    pub fn has_jobs(&self) -> bool {
        !self.job_ids.is_empty()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Skipped(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Failed { .. }))
            .count()
    }
}
