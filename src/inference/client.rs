// Inference client - Chat completions against the Hugging Face inference API
// POST {base_url}/models/{model}/v1/chat/completions with a bearer token

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{InferenceError, InferenceResult};
use super::token::ApiToken;
use crate::config::InferenceConfig;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling parameters for one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatParams {
    pub temperature: f32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub max_tokens: u32,
}

impl ChatParams {
    pub fn from_config(config: &InferenceConfig) -> Self {
        ChatParams {
            temperature: config.temperature,
            top_k: Some(config.top_k),
            top_p: Some(config.top_p),
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig) -> InferenceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Config(e.to_string()))?;

        Ok(InferenceClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            retry_delay: RETRY_BASE_DELAY,
        })
    }

    /// Same connection settings, different model
    pub fn for_model(&self, model: &str) -> Self {
        InferenceClient {
            model: model.to_string(),
            ..self.clone()
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}/v1/chat/completions", self.base_url, self.model)
    }

    /// Content of the first choice; empty when the model returned none.
    /// Transient failures are retried with a doubling delay.
    pub async fn chat(
        &self,
        token: &ApiToken,
        messages: &[ChatMessage],
        params: &ChatParams,
    ) -> InferenceResult<String> {
        let mut delay = self.retry_delay;
        let mut attempt = 0;

        loop {
            match self.chat_once(token, messages, params).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "Inference request to {} failed ({}), retry {}/{} in {:?}",
                        self.model,
                        e,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                result => return result,
            }
        }
    }

    async fn chat_once(
        &self,
        token: &ApiToken,
        messages: &[ChatMessage],
        params: &ChatParams,
    ) -> InferenceResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
        };

        log::debug!(
            "Chat request to {} with {} messages (token {})",
            self.model,
            messages.len(),
            token.fingerprint()
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(token.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InferenceError::from_status(status.as_u16(), text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
