// Inference errors - What can go wrong talking to the hosted model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("No API token available")]
    MissingToken,

    #[error("Unauthorized: the API token was rejected")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl InferenceError {
    /// Worth retrying after a delay
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::RateLimited | InferenceError::Network(_) | InferenceError::Timeout => true,
            InferenceError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => InferenceError::Unauthorized,
            429 => InferenceError::RateLimited,
            _ => InferenceError::Upstream { status, message: body },
        }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else if e.is_decode() {
            InferenceError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            InferenceError::from_status(status.as_u16(), e.to_string())
        } else {
            InferenceError::Network(e.to_string())
        }
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;
