// Adaptive learning - Personalized practice sessions and feedback on them

use serde::{Deserialize, Serialize};

use super::{AssistantError, AssistantResult};
use crate::inference::{ApiToken, ChatMessage, ChatParams, InferenceClient};

pub const TOPICS: [&str; 8] = [
    "Tone Production",
    "Articulation Technique",
    "Breath Control",
    "Range Extension",
    "Tonguing Speed",
    "Dynamic Control",
    "Intonation",
    "Reading Music",
];

pub const MAX_STEPS: usize = 5;
pub const SESSION_FEEDBACK: &str = "Complete these exercises and provide feedback for personalized adjustments.";
pub const DEFAULT_FEEDBACK: &str = "Keep practicing consistently and focus on gradual improvement.";
const DEFAULT_STEPS: [&str; 3] = [
    "Practice long tones",
    "Work on breath control",
    "Focus on consistent sound",
];

/// What the caller asks for
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default = "default_instrument")]
    pub instrument: String,
    #[serde(default = "default_skill")]
    pub skill_level: u8,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_minutes")]
    pub session_length: u32,
}

fn default_instrument() -> String {
    "trumpet".to_string()
}

fn default_skill() -> u8 {
    3
}

fn default_topic() -> String {
    TOPICS[0].to_string()
}

fn default_minutes() -> u32 {
    15
}

impl Default for SessionRequest {
    fn default() -> Self {
        SessionRequest {
            instrument: default_instrument(),
            skill_level: default_skill(),
            topic: default_topic(),
            session_length: default_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSession {
    pub topic: String,
    pub instructions: Vec<String>,
    pub difficulty: u8,
    pub adaptive_feedback: String,
}

impl LearningSession {
    pub fn default_for(topic: &str, difficulty: u8) -> Self {
        LearningSession {
            topic: topic.to_string(),
            instructions: DEFAULT_STEPS.iter().map(|s| s.to_string()).collect(),
            difficulty,
            adaptive_feedback: DEFAULT_FEEDBACK.to_string(),
        }
    }
}

pub fn session_prompts(request: &SessionRequest) -> AssistantResult<Vec<ChatMessage>> {
    if !(1..=5).contains(&request.skill_level) {
        return Err(AssistantError::InvalidSkill);
    }
    Ok(vec![
        ChatMessage::system(format!(
            "You are an adaptive learning assistant for {} players. Generate a personalized practice session for a skill level {} player (scale of 1-5) focusing on {}. The session should take about {} minutes to complete.",
            request.instrument, request.skill_level, request.topic, request.session_length
        )),
        ChatMessage::user(format!(
            "Create an adaptive learning session for {} focused on {}. My skill level is {}/5, and I have {} minutes to practice.",
            request.instrument, request.topic, request.skill_level, request.session_length
        )),
    ])
}

pub fn feedback_prompts(request: &SessionRequest, feedback: &str) -> AssistantResult<Vec<ChatMessage>> {
    if !(1..=5).contains(&request.skill_level) {
        return Err(AssistantError::InvalidSkill);
    }
    Ok(vec![
        ChatMessage::system(format!(
            "You are an adaptive learning assistant for {} players. Analyze the user's feedback on their practice session and provide personalized recommendations to improve their learning experience.",
            request.instrument
        )),
        ChatMessage::user(format!(
            "I just completed a practice session focused on {} at difficulty level {}/5. Here's my feedback: {}",
            request.topic, request.skill_level, feedback
        )),
    ])
}

/// Start offsets of "N. " markers
fn step_markers(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut markers = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() && (i == 0 || !bytes[i - 1].is_ascii_digit()) {
            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j + 1 < bytes.len() && bytes[j] == b'.' && bytes[j + 1].is_ascii_whitespace() {
                markers.push(i);
                i = j + 2;
                continue;
            }
            i = j;
            continue;
        }
        i += 1;
    }
    markers
}

/// Numbered steps ("1. Long tones ... 2. Lip slurs ..."), or failing that, the substantial
/// lines that are neither headings nor talk about the session itself. At most five.
pub fn parse_steps(response: &str) -> Vec<String> {
    let markers = step_markers(response);
    let steps: Vec<String> = if markers.is_empty() {
        response
            .lines()
            .map(str::trim)
            .filter(|line| {
                line.chars().count() > 10
                    && !line.starts_with('#')
                    && !line.contains("session")
                    && !line.contains("Session")
            })
            .map(str::to_string)
            .collect()
    } else {
        markers
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = markers.get(n + 1).copied().unwrap_or(response.len());
                response[start..end].trim().to_string()
            })
            .filter(|s| !s.is_empty())
            .collect()
    };
    steps.into_iter().take(MAX_STEPS).collect()
}

pub fn parse_session(response: &str, topic: &str, difficulty: u8) -> LearningSession {
    let instructions = parse_steps(response);
    if instructions.is_empty() {
        return LearningSession::default_for(topic, difficulty);
    }
    LearningSession {
        topic: topic.to_string(),
        instructions,
        difficulty,
        adaptive_feedback: SESSION_FEEDBACK.to_string(),
    }
}

/// Ask the model for a session. Without a token, or when the model fails, the default session
/// is returned.
pub async fn plan_session(
    client: &InferenceClient,
    token: Option<&ApiToken>,
    request: &SessionRequest,
    params: &ChatParams,
) -> AssistantResult<LearningSession> {
    let messages = session_prompts(request)?;
    let Some(token) = token else {
        return Ok(LearningSession::default_for(&request.topic, request.skill_level));
    };

    match client.chat(token, &messages, params).await {
        Ok(text) => Ok(parse_session(&text, &request.topic, request.skill_level)),
        Err(e) => {
            log::error!("Error generating adaptive session: {}", e);
            Ok(LearningSession::default_for(&request.topic, request.skill_level))
        }
    }
}

/// Recommendations after a session. Requires a working model.
pub async fn session_feedback(
    client: &InferenceClient,
    token: &ApiToken,
    request: &SessionRequest,
    feedback: &str,
    params: &ChatParams,
) -> AssistantResult<String> {
    if feedback.trim().is_empty() {
        return Err(AssistantError::NoPrompt);
    }
    let messages = feedback_prompts(request, feedback)?;
    Ok(client.chat(token, &messages, params).await?)
}
