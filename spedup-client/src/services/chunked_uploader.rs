//! Chunked upload of a filtered payload
//!
//! The payload is cut at plain byte offsets into fixed-size chunks which are
//! sent strictly in index order, each awaited before the next. Every request
//! repeats the expected line count and payload size so the server can verify
//! reassembly. The response to the last chunk carries the job id.

use crate::api::{ChunkRequest, IngestApi};
use crate::error::{ClientError, ClientResult};
use crate::models::{FilterResult, UploadSession};
use spedup_common::events::{EventBus, IngestEvent};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Throughput estimate at one point of an upload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub percentage: f64,
    pub speed_bytes_per_sec: f64,
    /// None while the speed is zero
    pub remaining_seconds: Option<u64>,
}

impl Throughput {
    /// Estimate from bytes sent so far and the time since the upload began
    pub fn estimate(sent: u64, total: u64, elapsed: Duration) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            (sent as f64 / total as f64) * 100.0
        };

        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 { sent as f64 / secs } else { 0.0 };

        let remaining_seconds = if speed > 0.0 {
            Some((total.saturating_sub(sent) as f64 / speed).ceil() as u64)
        } else {
            None
        };

        Self {
            percentage,
            speed_bytes_per_sec: speed,
            remaining_seconds,
        }
    }
}

/// Outcome of a completed upload session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub upload_id: String,
    pub total_chunks: usize,
    /// Job created by the server, if the final response named one
    pub job_id: Option<String>,
    /// Line count the server detected after reassembly
    pub detected_lines: Option<u64>,
}

/// Sends filtered payloads in bounded-size chunks
#[derive(Debug, Clone)]
pub struct ChunkedUploader {
    chunk_size: usize,
    company_id: Option<String>,
}

impl ChunkedUploader {
    /// `chunk_size` is clamped to at least one byte
    pub fn new(chunk_size: usize, company_id: Option<String>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            company_id,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Upload `payload` with a fresh session id
    pub async fn upload(
        &self,
        api: &dyn IngestApi,
        file_name: &str,
        payload: &FilterResult,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> ClientResult<UploadOutcome> {
        let session = UploadSession::new(payload.data.len(), self.chunk_size);
        self.upload_session(api, file_name, payload, session, events, cancel)
            .await
    }

    /// Upload `payload` within an existing session
    ///
    /// The first failing chunk aborts the session; chunks already sent are
    /// abandoned.
    pub async fn upload_session(
        &self,
        api: &dyn IngestApi,
        file_name: &str,
        payload: &FilterResult,
        session: UploadSession,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> ClientResult<UploadOutcome> {
        if payload.is_empty() {
            return Err(ClientError::BadRequest(format!(
                "{} contains no allow-listed records, nothing to upload",
                file_name
            )));
        }

        let total_bytes = payload.filtered_len();
        let started = Instant::now();
        let mut sent: u64 = 0;
        let mut last_response = None;

        tracing::info!(
            file = %file_name,
            upload_id = %session.upload_id,
            total_chunks = session.total_chunks,
            total_bytes,
            "Starting chunked upload"
        );

        for (chunk_index, range) in session.chunk_ranges().enumerate() {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            let chunk_len = range.len() as u64;
            let request = ChunkRequest {
                file_name: file_name.to_string(),
                upload_id: session.upload_id.clone(),
                chunk_index,
                total_chunks: session.total_chunks,
                expected_lines: payload.lines_retained,
                expected_size: total_bytes,
                company_id: self.company_id.clone(),
                data: payload.data[range].to_vec(),
            };

            let response = api.upload_chunk(request, cancel).await.map_err(|e| {
                tracing::error!(
                    file = %file_name,
                    upload_id = %session.upload_id,
                    chunk_index,
                    error = %e,
                    "Chunk upload failed, abandoning session"
                );
                e
            })?;

            sent += chunk_len;
            let throughput = Throughput::estimate(sent, total_bytes, started.elapsed());

            tracing::debug!(
                file = %file_name,
                chunk_index,
                total_chunks = session.total_chunks,
                bytes_uploaded = sent,
                "Chunk acknowledged"
            );

            events.emit_lossy(IngestEvent::UploadProgress {
                file_name: file_name.to_string(),
                chunk_index,
                total_chunks: session.total_chunks,
                percentage: throughput.percentage,
                bytes_uploaded: sent,
                bytes_total: total_bytes,
                speed_bytes_per_sec: throughput.speed_bytes_per_sec,
                remaining_seconds: throughput.remaining_seconds,
            });

            if session.is_last_chunk(chunk_index) {
                last_response = Some(response);
            }
        }

        let response = last_response.unwrap_or_default();

        match response.detected_lines {
            Some(detected) if detected != payload.lines_retained => {
                tracing::warn!(
                    file = %file_name,
                    expected_lines = payload.lines_retained,
                    detected_lines = detected,
                    "Server detected a different line count"
                );
            }
            Some(_) => {}
            None => {
                tracing::debug!(file = %file_name, "Final response carried no line count");
            }
        }

        match &response.job_id {
            Some(job_id) => tracing::info!(file = %file_name, job_id = %job_id, "Upload complete, job created"),
            None => tracing::warn!(file = %file_name, "Upload complete but server returned no job id"),
        }

        events.emit_lossy(IngestEvent::FileUploaded {
            file_name: file_name.to_string(),
            job_id: response.job_id.clone(),
            detected_lines: response.detected_lines,
        });

        Ok(UploadOutcome {
            upload_id: session.upload_id,
            total_chunks: session.total_chunks,
            job_id: response.job_id,
            detected_lines: response.detected_lines,
        })
    }
}
