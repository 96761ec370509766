// Inference module - Hugging Face hosted chat models
// OpenAI-style chat completions with bearer tokens, retries and a typed error taxonomy

pub mod client;
pub mod error;
pub mod token;

// Re-export main types
pub use client::{ChatMessage, ChatParams, InferenceClient, Role};
pub use error::{InferenceError, InferenceResult};
pub use token::{resolve_token, ApiToken};
