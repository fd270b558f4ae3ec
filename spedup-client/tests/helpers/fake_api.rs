//! Scripted in-memory ingestion API
//!
//! Behaves like a small server: uploads create jobs on their final chunk,
//! every job listing advances job status by one poll. Failures can be
//! scripted per file name or queued for the job listing.

use async_trait::async_trait;
use reqwest::StatusCode;
use spedup_client::api::{ChunkRequest, ChunkResponse, DuplicityCheck, IngestApi};
use spedup_client::error::{ClientError, ClientResult};
use spedup_client::models::{ImportJob, JobStatus};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// A call received by the fake, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CheckDuplicity {
        cnpj: String,
        period_start: String,
    },
    UploadChunk {
        file_name: String,
        upload_id: String,
        chunk_index: usize,
        total_chunks: usize,
        expected_lines: u64,
        expected_size: u64,
        company_id: Option<String>,
        len: usize,
    },
    ListJobs,
    CancelJob(String),
    RefreshViews,
}

/// Scripted failure for a job listing call
#[derive(Debug, Clone, Copy)]
pub enum ListFailure {
    Unauthorized,
    Unavailable,
}

struct ServerJob {
    job: ImportJob,
    polls_left: u32,
    final_status: JobStatus,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    duplicates: HashSet<(String, String)>,
    duplicity_fails: bool,
    failing_uploads: HashSet<String>,
    failing_chunks: HashSet<(String, usize)>,
    erroring_jobs: HashSet<String>,
    refresh_fails: bool,
    polls_until_terminal: u32,
    list_failures: VecDeque<ListFailure>,
    jobs: Vec<ServerJob>,
    payloads: HashMap<String, Vec<u8>>,
    next_job: u32,
}

/// In-memory [`IngestApi`]
#[derive(Clone, Default)]
pub struct FakeIngestApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeIngestApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an existing import for this identifier and period
    pub fn with_duplicate(self, cnpj: &str, period_start: &str) -> Self {
        self.lock().duplicates.insert((cnpj.to_string(), period_start.to_string()));
        self
    }

    /// Fail every duplicity check with a server error
    pub fn with_failing_duplicity_check(self) -> Self {
        self.lock().duplicity_fails = true;
        self
    }

    /// Fail every chunk of this file with 500
    pub fn with_failing_upload(self, file_name: &str) -> Self {
        self.lock().failing_uploads.insert(file_name.to_string());
        self
    }

    /// Fail only chunk `chunk_index` of this file with 500
    pub fn with_failing_chunk(self, file_name: &str, chunk_index: usize) -> Self {
        self.lock().failing_chunks.insert((file_name.to_string(), chunk_index));
        self
    }

    /// Jobs of this file end in `error` instead of `completed`
    pub fn with_erroring_job(self, file_name: &str) -> Self {
        self.lock().erroring_jobs.insert(file_name.to_string());
        self
    }

    /// Listings a job stays non-terminal before it finishes
    pub fn with_polls_until_terminal(self, polls: u32) -> Self {
        self.lock().polls_until_terminal = polls;
        self
    }

    /// Fail the next job listings in order
    pub fn with_list_failures(self, failures: &[ListFailure]) -> Self {
        self.lock().list_failures.extend(failures.iter().copied());
        self
    }

    pub fn with_failing_refresh(self) -> Self {
        self.lock().refresh_fails = true;
        self
    }

    /// Seed a job that exists independently of any upload
    pub fn insert_job(&self, id: &str, filename: &str, polls_left: u32, final_status: JobStatus) {
        self.lock().jobs.push(ServerJob {
            job: ImportJob {
                id: id.to_string(),
                filename: filename.to_string(),
                status: JobStatus::Pending,
                message: None,
                created_at: None,
                updated_at: None,
            },
            polls_left,
            final_status,
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn upload_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::UploadChunk { .. }))
            .collect()
    }

    pub fn uploaded_files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for call in self.upload_calls() {
            if let Call::UploadChunk { file_name, .. } = call {
                if files.last() != Some(&file_name) {
                    files.push(file_name);
                }
            }
        }
        files
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Reassembled bytes of an upload session
    pub fn payload(&self, upload_id: &str) -> Option<Vec<u8>> {
        self.lock().payloads.get(upload_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

fn server_error(status: StatusCode) -> ClientError {
    ClientError::from_status(status, "scripted failure".to_string())
}

#[async_trait]
impl IngestApi for FakeIngestApi {
    async fn check_duplicity(
        &self,
        cnpj: &str,
        period_start: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<DuplicityCheck> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let mut state = self.lock();
        state.calls.push(Call::CheckDuplicity {
            cnpj: cnpj.to_string(),
            period_start: period_start.to_string(),
        });
        if state.duplicity_fails {
            return Err(server_error(StatusCode::INTERNAL_SERVER_ERROR));
        }
        let exists = state
            .duplicates
            .contains(&(cnpj.to_string(), period_start.to_string()));
        Ok(DuplicityCheck {
            exists,
            message: if exists {
                "Period already imported".to_string()
            } else {
                String::new()
            },
        })
    }

    async fn upload_chunk(
        &self,
        request: ChunkRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<ChunkResponse> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let mut state = self.lock();
        state.calls.push(Call::UploadChunk {
            file_name: request.file_name.clone(),
            upload_id: request.upload_id.clone(),
            chunk_index: request.chunk_index,
            total_chunks: request.total_chunks,
            expected_lines: request.expected_lines,
            expected_size: request.expected_size,
            company_id: request.company_id.clone(),
            len: request.data.len(),
        });

        if state.failing_uploads.contains(&request.file_name)
            || state
                .failing_chunks
                .contains(&(request.file_name.clone(), request.chunk_index))
        {
            return Err(server_error(StatusCode::INTERNAL_SERVER_ERROR));
        }

        state
            .payloads
            .entry(request.upload_id.clone())
            .or_default()
            .extend_from_slice(&request.data);

        if request.chunk_index + 1 < request.total_chunks {
            return Ok(ChunkResponse::default());
        }

        state.next_job += 1;
        let id = format!("job-{}", state.next_job);
        let final_status = if state.erroring_jobs.contains(&request.file_name) {
            JobStatus::Error
        } else {
            JobStatus::Completed
        };
        let polls_left = state.polls_until_terminal;
        let detected = state
            .payloads
            .get(&request.upload_id)
            .map(|p| p.split(|&b| b == b'\n').filter(|l| !l.is_empty()).count() as u64);

        state.jobs.push(ServerJob {
            job: ImportJob {
                id: id.clone(),
                filename: request.file_name,
                status: JobStatus::Pending,
                message: None,
                created_at: None,
                updated_at: None,
            },
            polls_left,
            final_status,
        });

        Ok(ChunkResponse {
            job_id: Some(id),
            detected_lines: detected,
        })
    }

    async fn list_jobs(&self, cancel: &CancellationToken) -> ClientResult<Vec<ImportJob>> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let mut state = self.lock();
        state.calls.push(Call::ListJobs);

        match state.list_failures.pop_front() {
            Some(ListFailure::Unauthorized) => return Err(ClientError::Unauthorized),
            Some(ListFailure::Unavailable) => return Err(server_error(StatusCode::SERVICE_UNAVAILABLE)),
            None => {}
        }

        for server_job in state.jobs.iter_mut() {
            if server_job.polls_left > 0 {
                server_job.polls_left -= 1;
                server_job.job.status = JobStatus::Processing;
            } else {
                server_job.job.status = server_job.final_status;
            }
        }
        Ok(state.jobs.iter().map(|j| j.job.clone()).collect())
    }

    async fn cancel_job(&self, job_id: &str, cancel: &CancellationToken) -> ClientResult<()> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        self.lock().calls.push(Call::CancelJob(job_id.to_string()));
        Ok(())
    }

    async fn refresh_views(&self, cancel: &CancellationToken) -> ClientResult<()> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let mut state = self.lock();
        state.calls.push(Call::RefreshViews);
        if state.refresh_fails {
            return Err(server_error(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(())
    }
}
