use thiserror::Error;

use crate::types::FailureKind;

/// Failures of the extraction call for a single document.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no Operation-Location header in analyze response")]
    MissingOperationLocation,

    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("analysis did not finish after {0} polls")]
    PollTimeout(u32),

    #[error("service returned no documents")]
    NoDocuments,

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ExtractError {
    /// Worth another attempt: throttling, server faults and flaky transport.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ExtractError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ExtractError::NoDocuments => FailureKind::NoDocuments,
            ExtractError::AnalysisFailed(_) => FailureKind::Analysis,
            _ => FailureKind::Transport,
        }
    }
}
