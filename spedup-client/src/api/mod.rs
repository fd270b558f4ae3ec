//! Ingestion API collaborators
//!
//! The pipeline talks to the server exclusively through [`IngestApi`], so
//! tests can drive every stage with a scripted fake while production uses
//! [`HttpIngestApi`].

mod client;
pub mod types;

pub use client::HttpIngestApi;
pub use types::{ChunkRequest, ChunkResponse, DuplicityCheck};

use crate::error::ClientResult;
use crate::models::ImportJob;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// HTTP contract consumed by the pipeline
///
/// Every call takes a cancellation token; a cancelled call resolves to
/// `ClientError::Cancelled` without waiting for the server.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// `GET /api/check-duplicity?cnpj=&dt_ini=`
    async fn check_duplicity(
        &self,
        cnpj: &str,
        period_start: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<DuplicityCheck>;

    /// `POST /api/upload` with one chunk
    async fn upload_chunk(
        &self,
        request: ChunkRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<ChunkResponse>;

    /// `GET /api/jobs`
    async fn list_jobs(&self, cancel: &CancellationToken) -> ClientResult<Vec<ImportJob>>;

    /// `POST /api/jobs/{id}/cancel` (advisory)
    async fn cancel_job(&self, job_id: &str, cancel: &CancellationToken) -> ClientResult<()>;

    /// `POST /api/admin/refresh-views`
    async fn refresh_views(&self, cancel: &CancellationToken) -> ClientResult<()>;
}
