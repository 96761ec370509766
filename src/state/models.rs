// Data models for stored exercises
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exercise::Source;

/// One generated exercise as stored in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub instrument: String,
    pub key: String,
    pub time_signature: String,
    pub difficulty: String,
    pub focus: String,
    pub bars: u32,
    pub source: Source,
    pub seed: Option<u64>,
    /// The request parameters as received
    pub params_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub instrument: String,
    pub difficulty: String,
    pub source: Source,
    pub artifact_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: Uuid,
    pub exercise_id: String,
    pub kind: ArtifactKind,
    pub path: String,
    pub sha256: String,
    pub bytes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    MusicXml,
    Midi,
    Metadata,
    Audio,
    /// The full response payload as JSON
    Exercise,
    Trace,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::MusicXml,
        ArtifactKind::Midi,
        ArtifactKind::Metadata,
        ArtifactKind::Audio,
        ArtifactKind::Exercise,
        ArtifactKind::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::MusicXml => "musicxml",
            ArtifactKind::Midi => "midi",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Exercise => "exercise",
            ArtifactKind::Trace => "trace",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// File name inside the exercise directory
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::MusicXml => "score.musicxml",
            ArtifactKind::Midi => "score.mid",
            ArtifactKind::Metadata => "metadata.xml",
            ArtifactKind::Audio => "preview.wav",
            ArtifactKind::Exercise => "exercise.json",
            ArtifactKind::Trace => "trace.jsonl",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::MusicXml => "application/vnd.recordare.musicxml+xml",
            ArtifactKind::Midi => "audio/midi",
            ArtifactKind::Metadata => "application/xml",
            ArtifactKind::Audio => "audio/wav",
            ArtifactKind::Exercise => "application/json",
            ArtifactKind::Trace => "application/x-ndjson",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_kind_names() {
        for kind in ArtifactKind::ALL {
            assert_eq!(ArtifactKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ArtifactKind::parse("visualization"), None);
        assert_eq!(
            serde_json::to_string(&ArtifactKind::MusicXml).unwrap(),
            "\"musicxml\""
        );
    }
}
