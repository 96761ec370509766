// Token validation - A minimal chat request that tells whether a token works

use serde::Serialize;

use crate::inference::{ApiToken, ChatMessage, ChatParams, InferenceClient, InferenceError};

pub const TOKEN_REQUIRED: &str = "API token is required";
pub const VALID: &str = "Hugging Face authentication successful! Mistral 7B is now connected.";
pub const UNAUTHORIZED: &str = "Invalid or unauthorized API token. Please check your Hugging Face token and try again.";
pub const RATE_LIMITED: &str = "Rate limit exceeded. Please try again in a few minutes.";
pub const NETWORK: &str = "Network error connecting to Hugging Face API. Please check your internet connection.";
pub const UNAVAILABLE: &str = "Error connecting to Mistral 7B. Please try again later.";

const PROBE_MAX_TOKENS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub message: String,
}

impl TokenValidation {
    fn invalid(message: &str) -> Self {
        TokenValidation {
            valid: false,
            message: message.to_string(),
        }
    }
}

/// User-facing message for a failed probe
pub fn failure_message(error: &InferenceError) -> &'static str {
    match error {
        InferenceError::Unauthorized => UNAUTHORIZED,
        InferenceError::RateLimited => RATE_LIMITED,
        InferenceError::Network(_) | InferenceError::Timeout => NETWORK,
        _ => UNAVAILABLE,
    }
}

/// Probe the chat model with the token. The probe's answer is ignored; only success matters.
pub async fn validate_token(client: &InferenceClient, token: &ApiToken, temperature: f32) -> TokenValidation {
    let messages = [
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user("Hello"),
    ];
    let params = ChatParams {
        temperature,
        top_k: None,
        top_p: None,
        max_tokens: PROBE_MAX_TOKENS,
    };

    match client.chat(token, &messages, &params).await {
        Ok(_) => {
            log::info!("Token {} validated", token.fingerprint());
            TokenValidation {
                valid: true,
                message: VALID.to_string(),
            }
        }
        Err(e) => {
            log::warn!("Token {} failed validation: {}", token.fingerprint(), e);
            TokenValidation::invalid(failure_message(&e))
        }
    }
}
