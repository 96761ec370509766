// Practice chat - Trumpet assistant with keyword fallbacks when no model is reachable

use serde::Serialize;

use super::{AssistantError, AssistantResult};
use crate::inference::{ApiToken, ChatMessage, ChatParams, InferenceClient, Role};

pub const SYSTEM_PROMPT: &str = "You are a trumpet practice assistant and expert musician specializing in trumpet technique, practice methods, and music theory related to trumpet performance.
Your role is to provide helpful, encouraging, and accurate advice to trumpet players of all levels.
Focus on trumpet-specific techniques, sound production, breathing methods, and practice routines.
When discussing music, preference should be given to trumpet-focused repertoire and techniques.
For beginners, emphasize proper embouchure, breathing, and basic technique.
For intermediate players, focus on tone development, range extension, and more complex articulations.
For advanced players, provide insights on interpretation, advanced techniques, and performance preparation.
Always be encouraging and positive, but also honest and constructive with your feedback.";

pub const NEEDS_TOKEN: &str = "I'd love to help with your trumpet practice, but I need a Hugging Face API token to access my full capabilities. Please add your token in the AI Tools page.";

pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response at this time.";

pub const MODEL_UNAVAILABLE: &str = "I apologize, but I'm having trouble connecting to my knowledge base right now. For trumpet practice, I recommend focusing on fundamentals: long tones for sound quality, lip slurs for flexibility, and scale patterns for technique. Please try asking me again later for more specific guidance.";

/// Checked in order; the first topic with a matching keyword answers
const KEYWORD_ANSWERS: [(&[&str], &str); 4] = [
    (
        &["embouchure"],
        "Embouchure is the way you shape your lips to play the trumpet. A good embouchure involves firm corners with the lips centered and relaxed in the middle. Practice in front of a mirror to maintain proper form.",
    ),
    (
        &["breathing", "breath control"],
        "Breath control is essential for trumpet playing. Practice deep diaphragmatic breathing - fill your lungs from the bottom up, like filling a glass with water. Regular breathing exercises will significantly improve your tone and endurance.",
    ),
    (
        &["high notes", "range"],
        "To improve your high range on trumpet, work on lip slurs daily, gradually extending your range. Keep a relaxed throat, use good air support, and avoid excessive pressure. Be patient - range develops over time with consistent practice.",
    ),
    (
        &["tonguing", "articulation"],
        "For clean articulation on trumpet, practice with a metronome using different tonguing patterns (single, double, and triple tonguing). Start slowly and gradually increase speed while maintaining clarity. The tongue should strike as if saying 'tu' or 'du' rather than 'th'.",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// False when the answer is canned rather than from the model
    #[serde(skip)]
    pub from_model: bool,
}

/// Canned answer for the last user message when there is no token
pub fn keyword_fallback(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    KEYWORD_ANSWERS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, answer)| *answer)
        .unwrap_or(NEEDS_TOKEN)
}

/// Prepend the practice-assistant prompt unless the caller sent a system message
pub fn with_system_prompt(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    if messages.iter().any(|m| m.role == Role::System) {
        messages.to_vec()
    } else {
        std::iter::once(ChatMessage::system(SYSTEM_PROMPT))
            .chain(messages.iter().cloned())
            .collect()
    }
}

pub async fn chat_reply(
    client: &InferenceClient,
    token: Option<&ApiToken>,
    messages: &[ChatMessage],
    params: &ChatParams,
) -> AssistantResult<ChatReply> {
    let last = messages.last().ok_or(AssistantError::NoMessages)?;

    let Some(token) = token else {
        return Ok(ChatReply {
            response: keyword_fallback(&last.content).to_string(),
            from_model: false,
        });
    };

    match client.chat(token, &with_system_prompt(messages), params).await {
        Ok(content) if content.trim().is_empty() => Ok(ChatReply {
            response: EMPTY_REPLY.to_string(),
            from_model: true,
        }),
        Ok(content) => Ok(ChatReply {
            response: content,
            from_model: true,
        }),
        Err(e) => {
            log::error!("Error calling chat model: {}", e);
            Ok(ChatReply {
                response: MODEL_UNAVAILABLE.to_string(),
                from_model: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InferenceConfig;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> InferenceClient {
        InferenceClient::new(&InferenceConfig {
            base_url: uri.to_string(),
            max_retries: 0,
            ..InferenceConfig::default()
        })
        .unwrap()
    }

    fn params() -> ChatParams {
        ChatParams::from_config(&InferenceConfig::default())
    }

    #[test]
    fn test_keyword_fallback() {
        assert!(keyword_fallback("How do I fix my EMBOUCHURE?").starts_with("Embouchure is"));
        assert!(keyword_fallback("tips on breath control").starts_with("Breath control"));
        assert!(keyword_fallback("I can't hit high notes").starts_with("To improve your high range"));
        assert!(keyword_fallback("double tonguing help").starts_with("For clean articulation"));
        assert_eq!(keyword_fallback("hello"), NEEDS_TOKEN);
        // Earlier topics win
        assert!(keyword_fallback("embouchure and range").starts_with("Embouchure"));
    }

    #[test]
    fn test_system_prompt_added_once() {
        let messages = [ChatMessage::user("Hi")];
        let with = with_system_prompt(&messages);
        assert_eq!(with.len(), 2);
        assert_eq!(with[0].role, Role::System);

        let custom = [ChatMessage::system("Be brief"), ChatMessage::user("Hi")];
        assert_eq!(with_system_prompt(&custom), custom.to_vec());
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let result = chat_reply(&client("http://127.0.0.1:9"), None, &[], &params()).await;
        assert_eq!(result, Err(AssistantError::NoMessages));
    }

    #[tokio::test]
    async fn test_without_token_uses_fallback() {
        let reply = chat_reply(&client("http://127.0.0.1:9"), None, &[ChatMessage::user("range?")], &params())
            .await
            .unwrap();
        assert!(!reply.from_model);
        assert!(reply.response.contains("lip slurs"));
    }

    #[tokio::test]
    async fn test_model_answer_and_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"messages": [{"role": "system"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Play long tones."}}]
            })))
            .mount(&server)
            .await;
        let token = ApiToken::new("hf_x").unwrap();

        let reply = chat_reply(&client(&server.uri()), Some(&token), &[ChatMessage::user("Warmup?")], &params())
            .await
            .unwrap();
        assert_eq!(reply.response, "Play long tones.");
        assert!(reply.from_model);

        let down = chat_reply(&client("http://127.0.0.1:9"), Some(&token), &[ChatMessage::user("Warmup?")], &params())
            .await
            .unwrap();
        assert_eq!(down.response, MODEL_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_model_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": null}}]
            })))
            .mount(&server)
            .await;
        let token = ApiToken::new("hf_x").unwrap();
        let reply = chat_reply(&client(&server.uri()), Some(&token), &[ChatMessage::user("Hi")], &params())
            .await
            .unwrap();
        assert_eq!(reply.response, EMPTY_REPLY);
    }
}
