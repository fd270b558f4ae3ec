//! Import job records as reported by `GET /api/jobs`

use serde::{Deserialize, Deserializer, Serialize};
use spedup_common::events::JobStatus;

/// Server-owned import job
///
/// Created by the server when the last chunk of an upload session arrives.
/// The client only ever holds a read copy refreshed by polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    /// Server-assigned identifier
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Originating file name
    #[serde(default)]
    pub filename: String,
    pub status: JobStatus,
    /// Human-readable progress message
    #[serde(default)]
    pub message: Option<String>,
    /// Timestamps are kept as sent; the server does not guarantee an offset
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ImportJob {
    /// Check if the job reached `completed` or `error`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Decode a `GET /api/jobs` body
///
/// Records that do not decode (unknown status, missing id) are skipped with
/// a warning so one odd job cannot hide the rest of the listing. Only a body
/// that is not a JSON array is an error.
pub fn parse_job_listing(body: &str) -> Result<Vec<ImportJob>, serde_json::Error> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body)?;
    Ok(records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<ImportJob>(record) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable job record");
                None
            }
        })
        .collect())
}

/// Accept ids serialized either as JSON strings or integers
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}
