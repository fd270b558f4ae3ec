//! reqwest implementation of the ingestion API

use super::{ChunkRequest, ChunkResponse, DuplicityCheck, IngestApi};
use crate::error::{ClientError, ClientResult};
use crate::models::{parse_job_listing, ImportJob};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const USER_AGENT: &str = concat!("spedup/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Ingestion API over HTTP with bearer authentication
#[derive(Clone)]
pub struct HttpIngestApi {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpIngestApi {
    /// Create a client for `base_url` (e.g. `https://fiscal.example.com`)
    ///
    /// Only the connection phase is bounded; requests themselves have no
    /// client-side deadline because chunk uploads on slow links can be long.
    pub fn new(base_url: &str, token: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::BadRequest("server URL is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send with bearer auth, racing the cancellation token, and map
    /// non-2xx statuses to errors
    async fn send(&self, request: RequestBuilder, cancel: &CancellationToken) -> ClientResult<Response> {
        let request = request.bearer_auth(&self.token);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            result = request.send() => result?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, body = %body, "API request failed");
        Err(ClientError::from_status(status, body))
    }

    async fn read_body(response: Response, cancel: &CancellationToken) -> ClientResult<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            body = response.text() => Ok(body?),
        }
    }
}

#[async_trait]
impl IngestApi for HttpIngestApi {
    async fn check_duplicity(
        &self,
        cnpj: &str,
        period_start: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<DuplicityCheck> {
        let request = self
            .http_client
            .get(self.url("/api/check-duplicity"))
            .query(&[("cnpj", cnpj), ("dt_ini", period_start)]);

        let response = self.send(request, cancel).await?;
        let body = Self::read_body(response, cancel).await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn upload_chunk(
        &self,
        request: ChunkRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<ChunkResponse> {
        let mut form = Form::new();
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }
        let part = Part::bytes(request.data)
            .file_name(request.file_name)
            .mime_str("text/plain")?;
        form = form.part("file", part);

        let response = self
            .send(self.http_client.post(self.url("/api/upload")).multipart(form), cancel)
            .await?;
        let body = Self::read_body(response, cancel).await?;

        // Intermediate chunks may be acknowledged with an empty or non-JSON body
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            if !body.trim().is_empty() {
                tracing::debug!(error = %e, "Upload response is not a job descriptor");
            }
            ChunkResponse::default()
        }))
    }

    async fn list_jobs(&self, cancel: &CancellationToken) -> ClientResult<Vec<ImportJob>> {
        let response = self
            .send(self.http_client.get(self.url("/api/jobs")), cancel)
            .await?;
        let body = Self::read_body(response, cancel).await?;
        parse_job_listing(&body).map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn cancel_job(&self, job_id: &str, cancel: &CancellationToken) -> ClientResult<()> {
        let path = format!("/api/jobs/{}/cancel", job_id);
        self.send(self.http_client.post(self.url(&path)), cancel).await?;
        Ok(())
    }

    async fn refresh_views(&self, cancel: &CancellationToken) -> ClientResult<()> {
        self.send(self.http_client.post(self.url("/api/admin/refresh-views")), cancel)
            .await?;
        Ok(())
    }
}
