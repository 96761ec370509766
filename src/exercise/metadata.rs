// Exercise metadata - Titles, display fields and the generated-exercise payload

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::params::ExerciseSpec;
use crate::midi::instruments;

/// Which path produced an exercise's notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Seeded procedural generator
    Procedural,
    /// Notes written by the language model
    Model,
    /// Model was asked but failed; procedural notes were used instead
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Procedural => "procedural",
            Source::Model => "model",
            Source::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Source> {
        match s {
            "procedural" => Some(Source::Procedural),
            "model" => Some(Source::Model),
            "fallback" => Some(Source::Fallback),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseMetadata {
    pub title: String,
    pub instrument: String,
    pub key: String,
    pub time_signature: String,
    pub difficulty: String,
    pub focus: String,
    pub bars: u32,
    pub generated_at: DateTime<Utc>,
}

impl ExerciseMetadata {
    pub fn from_spec(spec: &ExerciseSpec, generated_at: DateTime<Utc>) -> Self {
        ExerciseMetadata {
            title: exercise_title(&spec.focus_type, &spec.key_name),
            instrument: instruments::display_name(&spec.instrument),
            key: spec.key_name.clone(),
            time_signature: spec.time.to_string(),
            difficulty: capitalize(spec.level.as_str()),
            focus: format!("{} - {}", spec.focus_type, spec.focus_value),
            bars: spec.bars,
            generated_at,
        }
    }
}

/// A finished exercise as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExercise {
    pub exercise_id: String,
    /// Base64 of a Standard MIDI File
    pub midi_data: String,
    #[serde(rename = "musicXML")]
    pub music_xml: String,
    pub metadata: ExerciseMetadata,
    pub source: Source,
    pub suggested_improvements: Vec<String>,
}

impl GeneratedExercise {
    pub fn midi_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.midi_data)
    }
}

/// Encode MIDI bytes for the `midiData` field
pub fn encode_midi_data(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// "Intervals Exercise in Bb"
pub fn exercise_title(focus_type: &str, key: &str) -> String {
    format!("{} Exercise in {}", capitalize(focus_type), key)
}

/// Short practice tips attached to every exercise
pub fn suggested_improvements(focus_type: &str) -> Vec<String> {
    vec![
        "Practice with a metronome to improve rhythm".to_string(),
        "Focus on hand position for better technique".to_string(),
        format!("Pay attention to the {} transitions", focus_type),
    ]
}

/// Exercise ids look like "ex-1a2b3c4d"
pub fn new_exercise_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("ex-{}", &simple[..8])
}

/// Upper-case the first character, lower-case the rest
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
