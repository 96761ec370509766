// Adaptive learning routes - Topics, planned sessions and post-session feedback

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::assistant::{plan_session, session_feedback, LearningSession, SessionRequest, TOPICS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    #[serde(flatten)]
    pub session: SessionRequest,
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(flatten)]
    pub session: SessionRequest,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Recommendations {
    pub recommendations: String,
}

pub async fn topics() -> Json<Vec<&'static str>> {
    Json(TOPICS.to_vec())
}

/// Model-planned session, or the default session when no token is available
pub async fn session(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> ApiResult<Json<LearningSession>> {
    let Json(request) = payload?;
    let token = state.token(request.api_token.as_deref());
    let planned = plan_session(&state.client, token.as_ref(), &request.session, &state.chat_params()).await?;
    Ok(Json(planned))
}

pub async fn feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<Json<Recommendations>> {
    let Json(request) = payload?;
    let token = state
        .token(request.api_token.as_deref())
        .ok_or_else(|| ApiError::bad_request("API token is required"))?;
    let recommendations = session_feedback(
        &state.client,
        &token,
        &request.session,
        &request.feedback,
        &state.chat_params(),
    )
    .await?;
    Ok(Json(Recommendations { recommendations }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_topics() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);
        let (status, body) = get_json(&app, "/api/adaptive/topics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 8);
        assert_eq!(body[0], "Tone Production");
    }

    #[tokio::test]
    async fn test_session_without_token_is_default() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);
        let (status, body) = post_json(
            &app,
            "/api/adaptive/session",
            json!({"topic": "Intonation", "skillLevel": 2}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["topic"], "Intonation");
        assert_eq!(body["difficulty"], 2);
        assert_eq!(body["instructions"][0], "Practice long tones");

        let (status, body) = post_json(&app, "/api/adaptive/session", json!({"skillLevel": 9})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Skill level must be between 1 and 5");
    }

    #[tokio::test]
    async fn test_feedback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("my lips got tired"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Rest between long tones."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let app = app(&dir, &server.uri(), None);

        let (status, body) = post_json(
            &app,
            "/api/adaptive/feedback",
            json!({"feedback": "my lips got tired"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "API token is required");

        let (status, body) = post_json(
            &app,
            "/api/adaptive/feedback",
            json!({"feedback": "my lips got tired", "apiToken": "hf_user"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendations"], "Rest between long tones.");
    }
}
