// Assistant routes - Practice chat, token validation and text generation

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::{ApiResult, AppState};
use crate::assistant::validate::TOKEN_REQUIRED;
use crate::assistant::{chat_reply, generate_text, validate_token, ChatReply, GeneratedText, TokenValidation};
use crate::inference::{ApiToken, ChatMessage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub api_token: Option<String>,
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatReply>> {
    let Json(request) = payload?;
    let token = state.token(request.api_token.as_deref());
    let reply = chat_reply(&state.client, token.as_ref(), &request.messages, &state.chat_params()).await?;
    Ok(Json(reply))
}

/// Always answers `{valid, message}`; a missing token is a 400 in the same shape
pub async fn validate(State(state): State<AppState>, payload: Result<Json<ValidateRequest>, JsonRejection>) -> Response {
    let token = match payload {
        Ok(Json(request)) => request.api_token.as_deref().and_then(ApiToken::new),
        Err(_) => None,
    };
    let Some(token) = token else {
        let body = TokenValidation {
            valid: false,
            message: TOKEN_REQUIRED.to_string(),
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };

    let result = validate_token(&state.client, &token, state.config.inference.temperature).await;
    Json(result).into_response()
}

pub async fn text_generation(
    State(state): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> ApiResult<Json<GeneratedText>> {
    let Json(request) = payload?;
    let token = state.token(request.api_token.as_deref());
    let client = state.client.for_model(&state.config.inference.text_model);
    let text = generate_text(&client, token.as_ref(), &request.prompt, &state.chat_params()).await?;
    Ok(Json(text))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_requires_messages() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);
        let (status, body) = post_json(&app, "/api/ai/mistral-chat", json!({"messages": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Valid messages are required");

        let (status, _) = post_json(&app, "/api/ai/mistral-chat", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_without_token_uses_keywords() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);
        let (status, body) = post_json(
            &app,
            "/api/ai/mistral-chat",
            json!({"messages": [{"role": "user", "content": "How do I fix my Embouchure?"}]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["response"].as_str().unwrap().starts_with("Embouchure is the way"));
    }

    #[tokio::test]
    async fn test_chat_with_configured_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Play long tones."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let app = app(&dir, &server.uri(), Some("hf_env"));
        let (status, body) = post_json(
            &app,
            "/api/ai/mistral-chat",
            json!({"messages": [{"role": "user", "content": "warmup?"}]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Play long tones.");
    }

    #[tokio::test]
    async fn test_validate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let app = app(&dir, &server.uri(), Some("hf_env"));

        let (status, body) = post_json(&app, "/api/ai/mistral-chat/validate", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"valid": false, "message": "API token is required"}));

        let (status, body) = post_json(&app, "/api/ai/mistral-chat/validate", json!({"apiToken": "hf_bad"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid or unauthorized"));
    }

    #[tokio::test]
    async fn test_text_generation() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);
        let (status, body) = post_json(&app, "/api/ai/text-generation", json!({"prompt": "hello"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], "sarvamai/shuka-1");
        assert!(body["text"].as_str().unwrap().starts_with("Generated response for: \"hello\"."));

        let (status, body) = post_json(&app, "/api/ai/text-generation", json!({"prompt": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Prompt is required");
    }

    #[tokio::test]
    async fn test_text_generation_uses_text_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/sarvamai/shuka-1/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "namaste"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let app = app(&dir, &server.uri(), None);
        let (status, body) = post_json(
            &app,
            "/api/ai/text-generation",
            json!({"prompt": "greet me", "apiToken": "hf_user"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"text": "namaste", "model": "sarvamai/shuka-1"}));
    }
}
