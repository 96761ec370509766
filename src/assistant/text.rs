// Text generation - Free-form completion, or a canned echo when no token is configured

use serde::Serialize;

use super::{AssistantError, AssistantResult};
use crate::inference::{ApiToken, ChatMessage, ChatParams, InferenceClient};

pub const MOCK_MODEL: &str = "sarvamai/shuka-1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedText {
    pub text: String,
    pub model: String,
}

pub fn mock_text(prompt: &str) -> GeneratedText {
    GeneratedText {
        text: format!(
            "Generated response for: \"{}\".\nThe Shuka-1 model would respond with relevant text here based on your input.\nThis is currently a mock implementation since we can't run the actual model in this environment.",
            prompt
        ),
        model: MOCK_MODEL.to_string(),
    }
}

pub async fn generate_text(
    client: &InferenceClient,
    token: Option<&ApiToken>,
    prompt: &str,
    params: &ChatParams,
) -> AssistantResult<GeneratedText> {
    if prompt.trim().is_empty() {
        return Err(AssistantError::NoPrompt);
    }

    let Some(token) = token else {
        return Ok(mock_text(prompt));
    };

    let text = client.chat(token, &[ChatMessage::user(prompt)], params).await?;
    Ok(GeneratedText {
        text,
        model: client.model().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceConfig;
    use crate::inference::InferenceError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> InferenceClient {
        let config = InferenceConfig {
            base_url: uri.to_string(),
            max_retries: 0,
            ..InferenceConfig::default()
        };
        InferenceClient::new(&config).unwrap().for_model(&config.text_model)
    }

    fn params() -> ChatParams {
        ChatParams::from_config(&InferenceConfig::default())
    }

    #[tokio::test]
    async fn test_prompt_required() {
        let result = generate_text(&client("http://127.0.0.1:9"), None, "  ", &params()).await;
        assert_eq!(result, Err(AssistantError::NoPrompt));
    }

    #[tokio::test]
    async fn test_mock_without_token() {
        let result = generate_text(&client("http://127.0.0.1:9"), None, "Write a haiku", &params())
            .await
            .unwrap();
        assert!(result.text.starts_with("Generated response for: \"Write a haiku\"."));
        assert_eq!(result.model, MOCK_MODEL);
    }

    #[tokio::test]
    async fn test_model_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/sarvamai/shuka-1/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Autumn brass"}}]
            })))
            .mount(&server)
            .await;
        let token = ApiToken::new("hf_x").unwrap();

        let result = generate_text(&client(&server.uri()), Some(&token), "haiku", &params())
            .await
            .unwrap();
        assert_eq!(result.text, "Autumn brass");
        assert_eq!(result.model, "sarvamai/shuka-1");

        let failed = generate_text(&client("http://127.0.0.1:9"), Some(&token), "haiku", &params()).await;
        assert!(matches!(failed, Err(AssistantError::Inference(InferenceError::Network(_)))));
    }
}
