// API errors - Every failure renders as {"error": message} with a status code

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::assistant::AssistantError;
use crate::midi::MidiError;
use crate::pipeline::PipelineError;
use crate::theory::TheoryError;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// Logs the cause and hides it from the client
    pub fn internal(public: &str, cause: impl std::fmt::Display) -> Self {
        log::error!("{}: {}", public, cause);
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: public.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Param(_) | PipelineError::MissingPrompt => ApiError::bad_request(e.to_string()),
            other => ApiError::internal("Failed to generate exercise", other),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(e: AssistantError) -> Self {
        match e {
            AssistantError::Inference(inner) => ApiError::internal("Failed to generate response", inner),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl From<MidiError> for ApiError {
    fn from(e: MidiError) -> Self {
        match e {
            MidiError::Notation(inner) => ApiError::bad_request(inner.to_string()),
            MidiError::InvalidPpq(_) | MidiError::InvalidTempo(_) | MidiError::ZeroDivisions => {
                ApiError::bad_request(e.to_string())
            }
            other => ApiError::internal("Failed to convert to MIDI", other),
        }
    }
}

impl From<TheoryError> for ApiError {
    fn from(e: TheoryError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}
