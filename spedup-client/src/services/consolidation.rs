//! Consolidated view refresh after a batch finishes

use crate::api::IngestApi;
use chrono::Utc;
use spedup_common::events::{EventBus, IngestEvent};
use tokio_util::sync::CancellationToken;

/// Result of the refresh call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationOutcome {
    Refreshed,
    /// Imports are intact; only the derived views may be out of date
    Stale { error: String },
}

/// Ask the server to rebuild its consolidated views, once
///
/// Failure is reported as a warning and never rolls anything back.
pub async fn refresh_views(
    api: &dyn IngestApi,
    events: &EventBus,
    cancel: &CancellationToken,
) -> ConsolidationOutcome {
    match api.refresh_views(cancel).await {
        Ok(()) => {
            tracing::info!("Consolidated views refreshed");
            events.emit_lossy(IngestEvent::ConsolidationCompleted { timestamp: Utc::now() });
            ConsolidationOutcome::Refreshed
        }
        Err(e) => {
            tracing::warn!(error = %e, "View refresh failed, consolidated views may be stale");
            events.emit_lossy(IngestEvent::ConsolidationFailed { error: e.to_string() });
            ConsolidationOutcome::Stale { error: e.to_string() }
        }
    }
}
