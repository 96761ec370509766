// HTTP server - JSON API for the practice assistant and exercise generation
// Routes are grouped by concern: assistant, exercises, midi, adaptive

pub mod adaptive;
pub mod assistant;
pub mod error;
pub mod exercises;
pub mod midi;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::inference::{resolve_token, ApiToken, ChatParams, InferenceClient};
use crate::pipeline::ExercisePipeline;
use crate::state::{init_db, Storage};

pub use error::{ApiError, ApiResult};

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: InferenceClient,
    pub pipeline: ExercisePipeline,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: Config, client: InferenceClient, pipeline: ExercisePipeline) -> Self {
        AppState {
            config: Arc::new(config),
            client,
            pipeline,
            started: Instant::now(),
        }
    }

    /// Open the database and artifact store named by the config
    pub fn open(config: Config) -> Result<Self> {
        let db = init_db(&config.database_path()).context("Failed to open database")?;
        let storage = Storage::new(&config.paths.data_dir).context("Failed to open data directory")?;
        let client = InferenceClient::new(&config.inference).context("Failed to build inference client")?;
        let pipeline = ExercisePipeline::new(db, storage, client.clone(), &config);
        Ok(AppState::new(config, client, pipeline))
    }

    /// Request token first, then the configured one
    pub fn token(&self, request: Option<&str>) -> Option<ApiToken> {
        resolve_token(request, self.config.inference.default_token.as_deref())
    }

    pub fn chat_params(&self) -> ChatParams {
        ChatParams::from_config(&self.config.inference)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ai/mistral-chat", post(assistant::chat))
        .route("/api/ai/mistral-chat/validate", post(assistant::validate))
        .route("/api/ai/mistral-midi", post(exercises::generate_with_model))
        .route("/api/ai/text-generation", post(assistant::text_generation))
        .route("/api/ai/streamlit-integration", post(exercises::create))
        .route("/api/exercises", post(exercises::create).get(exercises::list))
        .route("/api/exercises/{id}", get(exercises::get).delete(exercises::delete))
        .route("/api/exercises/{id}/musicxml", get(exercises::musicxml))
        .route("/api/exercises/{id}/midi", get(exercises::midi))
        .route("/api/exercises/{id}/metadata.xml", get(exercises::metadata))
        .route("/api/exercises/{id}/preview.wav", get(exercises::preview))
        .route("/api/exercises/{id}/trace", get(exercises::trace))
        .route("/api/midi/from-musicxml", post(midi::from_musicxml))
        .route("/api/midi/simple", post(midi::simple))
        .route("/api/instruments", get(midi::instruments))
        .route("/api/instruments/{name}", get(midi::instrument))
        .route("/api/adaptive/topics", get(adaptive::topics))
        .route("/api/adaptive/session", post(adaptive::session))
        .route("/api/adaptive/feedback", post(adaptive::feedback))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started.elapsed().as_secs(),
        "model": state.client.model(),
    }))
}

/// Bind and serve until SIGINT or SIGTERM
pub async fn run(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    log::info!("HarmonyHub listening on http://{}", bind);
    log::info!("   Data: {}", state.config.paths.data_dir.display());
    log::info!("   Model: {}", state.client.model());

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            log::info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            log::warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::InferenceConfig;
    use crate::state::open_in_memory;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// App backed by an in-memory database and a temporary data directory
    pub fn app(dir: &TempDir, base_url: &str, default_token: Option<&str>) -> Router {
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();
        config.inference = InferenceConfig {
            base_url: base_url.to_string(),
            default_token: default_token.map(str::to_string),
            max_retries: 0,
            ..InferenceConfig::default()
        };
        let client = InferenceClient::new(&config.inference)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1));
        let pipeline = ExercisePipeline::new(
            open_in_memory().unwrap(),
            Storage::new(dir.path()).unwrap(),
            client.clone(),
            &config,
        );
        router(AppState::new(config, client, pipeline))
    }

    pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, bytes) = send(app, request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, _, bytes) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    pub const OFFLINE: &str = "http://127.0.0.1:9";
}
