//! Hard failures surfaced by the ingest pipeline.
//!
//! Facet-level persistence failures and audit findings are data, carried in
//! result structs; only the cases below abort an operation.

use thiserror::Error;

use crate::fetcher::FetchError;
use crate::scorer::CompletenessReport;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream fetch failed after retries, or failed permanently
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The record has no usable definitions and was not written
    #[error("Rejected '{word}': no definitions in any family")]
    ValidationRejected {
        word: String,
        report: CompletenessReport,
    },

    /// The word row could not be created or found
    #[error("Could not resolve word '{word}': {source}")]
    Identity {
        word: String,
        #[source]
        source: anyhow::Error,
    },

    /// Any other storage failure outside per-facet isolation
    #[error("Storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl PipelineError {
    /// Suggested HTTP status for an outer web layer.
    ///
    /// Transport failures and exhausted retries map to 503, timeouts to 408,
    /// an upstream 404 to 404, rejection to 422, everything else to 500.
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::Fetch(e) => match e.root_cause() {
                FetchError::Timeout(_) => 408,
                FetchError::Http { status: 404 } => 404,
                FetchError::Network(_) | FetchError::Http { .. } => 503,
                FetchError::Extract(_) => 502,
                FetchError::InvalidUrl(_) | FetchError::RetriesExhausted { .. } => 500,
            },
            Self::ValidationRejected { .. } => 422,
            Self::Identity { .. } | Self::Storage(_) => 500,
        }
    }

    /// Whether the failure was caused by the caller's input rather than by
    /// this system or its collaborators.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationRejected { .. } | Self::Fetch(FetchError::Http { status: 404 })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractError;

    fn rejected() -> PipelineError {
        PipelineError::ValidationRejected {
            word: "zzzz".to_string(),
            report: CompletenessReport {
                is_complete: false,
                is_partially_valid: false,
                missing_fields: vec!["definitions".to_string()],
                issues: vec![],
            },
        }
    }

    #[test]
    fn exhausted_server_errors_map_to_503() {
        let error = PipelineError::from(FetchError::RetriesExhausted {
            attempts: 3,
            last: Box::new(FetchError::Http { status: 502 }),
        });
        assert_eq!(error.status_hint(), 503);
    }

    #[test]
    fn rejection_is_distinct_from_storage_failure() {
        let storage = PipelineError::Storage(anyhow::anyhow!("disk full"));

        assert_eq!(rejected().status_hint(), 422);
        assert!(rejected().is_user_error());
        assert_eq!(storage.status_hint(), 500);
        assert!(!storage.is_user_error());
    }

    #[test]
    fn extraction_failure_maps_to_bad_gateway() {
        let error = PipelineError::from(FetchError::Extract(ExtractError::EmptyDocument));
        assert_eq!(error.status_hint(), 502);
        assert!(format!("{error}").contains("document is empty"));
    }
}
