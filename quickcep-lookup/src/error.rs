use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid postal code: {0:?}")]
    InvalidPostalCode(String),
    #[error("failed to construct request: {0}")]
    RequestConstruction(String),
    #[error("transport error: {0}")]
    Transport(#[from] Box<reqwest::Error>),
    /// The shared cancellation token fired before the request completed. Counted as a
    /// transport-level failure.
    #[error("request cancelled")]
    Cancelled,
    #[error("unexpected status code: {}", .0.as_u16())]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("failed to decode response body: {0}")]
    Decode(#[from] Box<serde_json::Error>),
    #[error("postal code not found: {0}")]
    NotFound(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl LookupError {
    /// Whether the error originated below HTTP semantics (connect, read, cancellation).
    pub fn is_transport(&self) -> bool {
        matches!(self, LookupError::Transport(_) | LookupError::Cancelled)
    }

    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            LookupError::UnexpectedStatus(status) => Some(*status),
            LookupError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            LookupError::RequestConstruction(err.to_string())
        } else {
            LookupError::Transport(Box::new(err))
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Decode(Box::new(err))
    }
}

impl From<url::ParseError> for LookupError {
    fn from(err: url::ParseError) -> Self {
        LookupError::RequestConstruction(err.to_string())
    }
}
