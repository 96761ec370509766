// Assistant module - Practice chat, token checks, adaptive sessions and text generation
// Each operation works without a token by falling back to canned answers

pub mod chat;
pub mod session;
pub mod text;
pub mod validate;

use thiserror::Error;

use crate::inference::InferenceError;

#[derive(Error, Debug, PartialEq)]
pub enum AssistantError {
    #[error("Valid messages are required")]
    NoMessages,

    #[error("Prompt is required")]
    NoPrompt,

    #[error("Skill level must be between 1 and 5")]
    InvalidSkill,

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

pub type AssistantResult<T> = Result<T, AssistantError>;

// Re-export main types
pub use chat::{chat_reply, ChatReply};
pub use session::{
    feedback_prompts, parse_session, plan_session, session_feedback, session_prompts, LearningSession, SessionRequest,
    TOPICS,
};
pub use text::{generate_text, GeneratedText};
pub use validate::{validate_token, TokenValidation};
