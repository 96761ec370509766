// Exercise routes - Procedural and model-driven generation, stored exercises and their files

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::exercise::{ExerciseParameters, GeneratedExercise, Source};
use crate::pipeline::TraceEntry;
use crate::state::{ArtifactKind, ExerciseSummary};

const PARAMETERS_REQUIRED: &str = "Exercise parameters are required";
const TOKEN_REQUIRED: &str = "Hugging Face API token is required. Please provide it in the settings.";
const NOT_FOUND: &str = "Exercise not found";

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    #[serde(default)]
    pub parameters: Option<ExerciseParameters>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub parameters: Option<ExerciseParameters>,
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Parameters echoed back by the model-driven route
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoedParameters {
    pub instrument: String,
    pub key: String,
    pub time_signature: String,
    pub level: String,
    pub focus: String,
    pub bars: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub exercise_id: String,
    /// Base64 Standard MIDI File
    pub midi_sequence: String,
    #[serde(rename = "musicXML")]
    pub music_xml: String,
    pub parameters: EchoedParameters,
    pub suggested_improvements: Vec<String>,
    pub source: Source,
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<Json<GeneratedExercise>> {
    let Json(request) = payload?;
    let params = request
        .parameters
        .ok_or_else(|| ApiError::bad_request(PARAMETERS_REQUIRED))?;

    let pipeline = state.pipeline.clone();
    let exercise = tokio::task::spawn_blocking(move || pipeline.generate(&params))
        .await
        .map_err(|e| ApiError::internal("Failed to generate exercise", e))??;
    Ok(Json(exercise))
}

pub async fn generate_with_model(
    State(state): State<AppState>,
    payload: Result<Json<ModelRequest>, JsonRejection>,
) -> ApiResult<Json<ModelResponse>> {
    let Json(request) = payload?;
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }
    let token = state
        .token(request.api_token.as_deref())
        .ok_or_else(|| ApiError::bad_request(TOKEN_REQUIRED))?;

    let params = request.parameters.unwrap_or_default();
    let exercise = state
        .pipeline
        .generate_with_model(&params, &request.prompt, Some(&token))
        .await?;

    let metadata = &exercise.metadata;
    let level = params.level.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let parameters = EchoedParameters {
        instrument: metadata.instrument.clone(),
        key: metadata.key.clone(),
        time_signature: metadata.time_signature.clone(),
        level: level.unwrap_or("beginner").to_lowercase(),
        focus: metadata.focus.clone(),
        bars: metadata.bars,
    };

    Ok(Json(ModelResponse {
        exercise_id: exercise.exercise_id,
        midi_sequence: exercise.midi_data,
        music_xml: exercise.music_xml,
        parameters,
        suggested_improvements: exercise.suggested_improvements,
        source: exercise.source,
    }))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<ExerciseSummary>>> {
    Ok(Json(state.pipeline.list()?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<GeneratedExercise>> {
    state
        .pipeline
        .load(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if state.pipeline.delete(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(NOT_FOUND))
    }
}

fn artifact_response(state: &AppState, id: &str, kind: ArtifactKind) -> ApiResult<Response> {
    let (artifact, data) = state
        .pipeline
        .artifact(id, kind)?
        .ok_or_else(|| ApiError::not_found(format!("No {} for exercise {}", kind.as_str(), id)))?;
    Ok((
        [
            (header::CONTENT_TYPE, kind.content_type().to_string()),
            (header::ETAG, format!("\"{}\"", artifact.sha256)),
        ],
        data,
    )
        .into_response())
}

pub async fn musicxml(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    artifact_response(&state, &id, ArtifactKind::MusicXml)
}

pub async fn midi(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    artifact_response(&state, &id, ArtifactKind::Midi)
}

pub async fn metadata(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    artifact_response(&state, &id, ArtifactKind::Metadata)
}

pub async fn preview(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    artifact_response(&state, &id, ArtifactKind::Audio)
}

pub async fn trace(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<TraceEntry>>> {
    state
        .pipeline
        .trace(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parameters() -> serde_json::Value {
        json!({
            "instrument": "clarinet",
            "level": "intermediate",
            "key": "F",
            "meterNumerator": "3",
            "meterDenominator": 4,
            "focusType": "arpeggios",
            "focusValue": "major",
            "bars": "4",
            "seed": 5
        })
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);

        let (status, created) = post_json(&app, "/api/exercises", json!({"parameters": parameters()})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["source"], "procedural");
        assert_eq!(created["metadata"]["title"], "Arpeggios Exercise in F");
        assert_eq!(created["metadata"]["timeSignature"], "3/4");
        assert_eq!(created["metadata"]["difficulty"], "Intermediate");
        let id = created["exerciseId"].as_str().unwrap().to_string();

        let (status, fetched) = get_json(&app, &format!("/api/exercises/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, list) = get_json(&app, "/api/exercises").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["id"], id.as_str());
        assert_eq!(list[0]["artifactCount"], 6);

        let (status, headers, body) = send(
            &app,
            Request::get(format!("/api/exercises/{id}/midi")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "audio/midi");
        assert!(body.starts_with(b"MThd"));

        let (_, headers, body) = send(
            &app,
            Request::get(format!("/api/exercises/{id}/musicxml")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(headers["content-type"], "application/vnd.recordare.musicxml+xml");
        assert!(String::from_utf8(body).unwrap().contains("<score-partwise"));

        let (_, headers, body) = send(
            &app,
            Request::get(format!("/api/exercises/{id}/preview.wav")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(headers["content-type"], "audio/wav");
        assert!(body.starts_with(b"RIFF"));

        let (status, trace) = get_json(&app, &format!("/api/exercises/{id}/trace")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trace.as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);

        let (status, body) = post_json(&app, "/api/exercises", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Exercise parameters are required");

        let (status, body) = post_json(
            &app,
            "/api/exercises",
            json!({"parameters": {"meterNumerator": "5", "meterDenominator": "3"}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid time signature: 5/3");

        let (status, _) = post_json(&app, "/api/ai/streamlit-integration", json!({"parameters": {}})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_and_delete() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);

        let (status, body) = get_json(&app, "/api/exercises/ex-missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Exercise not found");

        let (_, created) = post_json(&app, "/api/exercises", json!({"parameters": parameters()})).await;
        let id = created["exerciseId"].as_str().unwrap().to_string();

        let delete = || Request::delete(format!("/api/exercises/{id}")).body(Body::empty()).unwrap();
        let (status, _, _) = send(&app, delete()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _, _) = send(&app, delete()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_json(&app, &format!("/api/exercises/{id}/midi")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_model_route_requires_prompt_and_token() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, OFFLINE, None);

        let (status, body) = post_json(&app, "/api/ai/mistral-midi", json!({"apiToken": "hf_x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Prompt is required");

        let (status, body) = post_json(&app, "/api/ai/mistral-midi", json!({"prompt": "scales"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Hugging Face API token is required"));
    }

    #[tokio::test]
    async fn test_model_route_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Sorry, I can only describe music."}}]
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let app = app(&dir, &server.uri(), None);
        let (status, body) = post_json(
            &app,
            "/api/ai/mistral-midi",
            json!({"prompt": "a waltz", "apiToken": "hf_user", "parameters": parameters()}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "fallback");
        assert_eq!(
            body["parameters"],
            json!({
                "instrument": "Clarinet",
                "key": "F",
                "timeSignature": "3/4",
                "level": "intermediate",
                "focus": "arpeggios - major",
                "bars": 4
            })
        );
        assert!(body["musicXML"].as_str().unwrap().contains("<beats>3</beats>"));
        assert!(!body["midiSequence"].as_str().unwrap().is_empty());
    }
}
