//! Duplicate import guard
//!
//! Reads only a small prefix of the raw ledger, finds the header record and
//! asks the server whether the same taxpayer and period were already
//! imported. The check is a convenience: a missing header, an unreadable
//! prefix or a server error all count as "no known duplicate".

use crate::api::IngestApi;
use crate::error::{ClientError, ClientResult};
use crate::models::SourceFile;
use async_trait::async_trait;
use spedup_common::events::{EventBus, IngestEvent};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use super::record_filter::{record_tag, FIELD_DELIMITER};

/// Position of the header fields the duplicate check needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Record tag of the header line
    pub tag: String,
    /// Index of the period-start field after splitting on the delimiter
    pub period_start_field: usize,
    /// Index of the taxpayer identifier (CNPJ) field
    pub identifier_field: usize,
}

impl Default for HeaderLayout {
    fn default() -> Self {
        // |0000|COD_VER|COD_FIN|DT_INI|DT_FIN|NOME|CNPJ|...
        Self {
            tag: "0000".to_string(),
            period_start_field: 4,
            identifier_field: 7,
        }
    }
}

/// Fields extracted from the header record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerHeader {
    pub cnpj: String,
    pub period_start: String,
}

impl HeaderLayout {
    /// Find the header line in `prefix` and extract its fields
    ///
    /// Returns None when the header is absent or either field is empty.
    pub fn parse(&self, prefix: &[u8]) -> Option<LedgerHeader> {
        let line = prefix
            .split(|&b| b == b'\n')
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .find(|l| l.first() == Some(&FIELD_DELIMITER) && record_tag(l) == self.tag.as_bytes())?;

        let fields: Vec<&[u8]> = line.split(|&b| b == FIELD_DELIMITER).collect();
        let field = |index: usize| {
            fields
                .get(index)
                .map(|f| String::from_utf8_lossy(f).trim().to_string())
                .filter(|f| !f.is_empty())
        };

        Some(LedgerHeader {
            period_start: field(self.period_start_field)?,
            cnpj: field(self.identifier_field)?,
        })
    }
}

/// Operator decision when the server already holds an import
#[async_trait]
pub trait DuplicateResolver: Send + Sync {
    /// Return true to upload anyway, false to skip the file
    async fn confirm_reimport(&self, file: &SourceFile, header: &LedgerHeader, message: &str) -> bool;
}

/// Always re-import (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

#[async_trait]
impl DuplicateResolver for AssumeYes {
    async fn confirm_reimport(&self, _: &SourceFile, _: &LedgerHeader, _: &str) -> bool {
        true
    }
}

/// Always skip known duplicates
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

#[async_trait]
impl DuplicateResolver for AssumeNo {
    async fn confirm_reimport(&self, _: &SourceFile, _: &LedgerHeader, _: &str) -> bool {
        false
    }
}

/// Result of the duplicate check for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Continue with filtering and upload
    Proceed,
    /// Operator declined the re-import
    Declined,
}

/// Duplicate check in front of every upload
pub struct DuplicateGuard {
    layout: HeaderLayout,
    probe_bytes: usize,
    resolver: Arc<dyn DuplicateResolver>,
}

impl DuplicateGuard {
    pub fn new(layout: HeaderLayout, probe_bytes: usize, resolver: Arc<dyn DuplicateResolver>) -> Self {
        Self {
            layout,
            probe_bytes: probe_bytes.max(1),
            resolver,
        }
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    pub fn probe_bytes(&self) -> usize {
        self.probe_bytes
    }

    /// Run the check for `file`
    ///
    /// Only cancellation is reported as an error; every other failure
    /// resolves to [`GuardDecision::Proceed`].
    pub async fn check(
        &self,
        api: &dyn IngestApi,
        file: &SourceFile,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> ClientResult<GuardDecision> {
        let prefix = match read_prefix(file, self.probe_bytes).await {
            Ok(prefix) => prefix,
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "Could not read header prefix, skipping duplicate check");
                return Ok(GuardDecision::Proceed);
            }
        };

        let Some(header) = self.layout.parse(&prefix) else {
            tracing::warn!(
                file = %file.name,
                probe_bytes = self.probe_bytes,
                "Header record not found, skipping duplicate check"
            );
            return Ok(GuardDecision::Proceed);
        };

        let check = match api.check_duplicity(&header.cnpj, &header.period_start, cancel).await {
            Ok(check) => check,
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "Duplicate check failed, continuing");
                return Ok(GuardDecision::Proceed);
            }
        };

        if !check.exists {
            tracing::debug!(file = %file.name, cnpj = %header.cnpj, period_start = %header.period_start, "No previous import");
            return Ok(GuardDecision::Proceed);
        }

        tracing::info!(
            file = %file.name,
            cnpj = %header.cnpj,
            period_start = %header.period_start,
            "Server already holds an import for this period"
        );

        events.emit_lossy(IngestEvent::DuplicateDetected {
            file_name: file.name.clone(),
            cnpj: header.cnpj.clone(),
            period_start: header.period_start.clone(),
            message: check.message.clone(),
        });

        if self.resolver.confirm_reimport(file, &header, &check.message).await {
            tracing::info!(file = %file.name, "Re-import confirmed");
            Ok(GuardDecision::Proceed)
        } else {
            tracing::info!(file = %file.name, "Re-import declined");
            Ok(GuardDecision::Declined)
        }
    }
}

/// Read at most `limit` bytes from the start of the file
async fn read_prefix(file: &SourceFile, limit: usize) -> std::io::Result<Vec<u8>> {
    let handle = tokio::fs::File::open(&file.path).await?;
    let mut prefix = Vec::with_capacity(limit.min(file.size as usize));
    handle.take(limit as u64).read_to_end(&mut prefix).await?;
    Ok(prefix)
}
