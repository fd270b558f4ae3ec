//! Request and response shapes of the ingestion API

use serde::{Deserialize, Deserializer, Serialize};

/// `GET /api/check-duplicity` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicityCheck {
    pub exists: bool,
    #[serde(default)]
    pub message: String,
}

/// One `POST /api/upload` multipart request
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    /// File name reported in the multipart `file` part
    pub file_name: String,
    pub upload_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Retained line count of the whole payload
    pub expected_lines: u64,
    /// Byte length of the whole payload
    pub expected_size: u64,
    pub company_id: Option<String>,
    /// Chunk bytes
    pub data: Vec<u8>,
}

impl ChunkRequest {
    /// Text fields of the multipart form, in send order
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("is_chunked", "true".to_string()),
            ("upload_id", self.upload_id.clone()),
            ("chunk_index", self.chunk_index.to_string()),
            ("total_chunks", self.total_chunks.to_string()),
            ("expected_lines", self.expected_lines.to_string()),
            ("expected_size", self.expected_size.to_string()),
        ];
        if let Some(company_id) = &self.company_id {
            fields.push(("company_id", company_id.clone()));
        }
        fields
    }
}

/// `POST /api/upload` response
///
/// Intermediate chunks may answer with any body; only the response to the
/// final chunk carries the job id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChunkResponse {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub detected_lines: Option<u64>,
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(company_id: Option<&str>) -> ChunkRequest {
        ChunkRequest {
            file_name: "efd.txt".to_string(),
            upload_id: "1700000000000-abc".to_string(),
            chunk_index: 2,
            total_chunks: 3,
            expected_lines: 1234,
            expected_size: 4_718_592,
            company_id: company_id.map(str::to_string),
            data: vec![b'x'; 8],
        }
    }

    #[test]
    fn test_form_fields_carry_position_and_integrity_metadata() {
        let fields = request(None).form_fields();
        let get = |k: &str| fields.iter().find(|(name, _)| *name == k).map(|(_, v)| v.as_str());

        assert_eq!(get("is_chunked"), Some("true"));
        assert_eq!(get("upload_id"), Some("1700000000000-abc"));
        assert_eq!(get("chunk_index"), Some("2"));
        assert_eq!(get("total_chunks"), Some("3"));
        assert_eq!(get("expected_lines"), Some("1234"));
        assert_eq!(get("expected_size"), Some("4718592"));
        assert_eq!(get("company_id"), None);
    }

    #[test]
    fn test_company_id_is_optional_field() {
        let fields = request(Some("17")).form_fields();
        assert!(fields.contains(&("company_id", "17".to_string())));
    }

    #[test]
    fn test_chunk_response_variants() {
        let final_chunk: ChunkResponse =
            serde_json::from_str(r#"{"job_id": "abc", "detected_lines": 1234}"#).unwrap();
        assert_eq!(final_chunk.job_id.as_deref(), Some("abc"));
        assert_eq!(final_chunk.detected_lines, Some(1234));

        let numeric: ChunkResponse = serde_json::from_str(r#"{"job_id": 99}"#).unwrap();
        assert_eq!(numeric.job_id.as_deref(), Some("99"));

        let intermediate: ChunkResponse =
            serde_json::from_str(r#"{"status": "chunk_received"}"#).unwrap();
        assert_eq!(intermediate, ChunkResponse::default());

        let null_id: ChunkResponse = serde_json::from_str(r#"{"job_id": null}"#).unwrap();
        assert!(null_id.job_id.is_none());
    }

    #[test]
    fn test_duplicity_message_defaults_to_empty() {
        let check: DuplicityCheck = serde_json::from_str(r#"{"exists": false}"#).unwrap();
        assert!(!check.exists);
        assert!(check.message.is_empty());
    }
}
