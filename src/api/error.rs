use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a request/response call to the control server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid endpoint '{path}': {reason}")]
    Endpoint { path: String, reason: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status; carries the response body text for display
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }
}
