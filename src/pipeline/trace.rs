// Generation tracing
// One JSONL line per pipeline stage, stored next to the exercise artifacts

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stages of exercise generation, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Compose,
    Notation,
    Midi,
    Preview,
    Persist,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Parse,
        Stage::Compose,
        Stage::Notation,
        Stage::Midi,
        Stage::Preview,
        Stage::Persist,
    ];

    /// Fraction of the pipeline finished once this stage completes
    pub fn progress(&self) -> f32 {
        let index = Stage::ALL.iter().position(|s| s == self).unwrap_or(0);
        (index + 1) as f32 / Stage::ALL.len() as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    /// RFC 3339
    pub timestamp: String,
    pub exercise_id: String,
    pub stage: Stage,
    /// 0.0..=1.0
    pub progress: f32,
    /// Milliseconds since the trace started
    pub elapsed_ms: u64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Collects entries while an exercise is being generated. The trace is written once the
/// exercise directory exists.
#[derive(Debug)]
pub struct GenerationTrace {
    exercise_id: String,
    started: Instant,
    entries: Vec<TraceEntry>,
}

impl GenerationTrace {
    pub fn new(exercise_id: &str) -> Self {
        GenerationTrace {
            exercise_id: exercise_id.to_string(),
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: Stage, message: impl Into<String>) {
        self.push(stage, message.into(), None);
    }

    pub fn record_with(&mut self, stage: Stage, message: impl Into<String>, data: serde_json::Value) {
        self.push(stage, message.into(), Some(data));
    }

    fn push(&mut self, stage: Stage, message: String, data: Option<serde_json::Value>) {
        log::debug!("[{}] {:?}: {}", self.exercise_id, stage, message);
        self.entries.push(TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            exercise_id: self.exercise_id.clone(),
            stage,
            progress: stage.progress(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            message,
            data,
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// The whole trace as JSONL
    pub fn to_jsonl(&self) -> Result<String, TraceError> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_json_line()?);
        }
        Ok(out)
    }
}

/// Append-only JSONL trace file
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append entries, creating the file if needed
    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            file.write_all(entry.to_json_line()?.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Parse JSONL trace text; blank lines are skipped
pub fn parse_trace(contents: &str) -> Result<Vec<TraceEntry>, TraceError> {
    let mut entries = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }
    Ok(entries)
}

pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    parse_trace(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_progress() {
        assert!((Stage::Parse.progress() - 1.0 / 6.0).abs() < 1e-6);
        assert_eq!(Stage::Persist.progress(), 1.0);
        assert!(Stage::Midi.progress() > Stage::Notation.progress());
    }

    #[test]
    fn test_record_entries() {
        let mut trace = GenerationTrace::new("ex-12345678");
        trace.record(Stage::Parse, "Parameters accepted");
        trace.record_with(Stage::Compose, "Procedural score", serde_json::json!({"seed": 7}));

        let entries = trace.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].exercise_id, "ex-12345678");
        assert_eq!(entries[0].stage, Stage::Parse);
        assert!(entries[0].data.is_none());
        assert_eq!(entries[1].data.as_ref().unwrap()["seed"], 7);
        assert!(entries[1].elapsed_ms >= entries[0].elapsed_ms);
    }

    #[test]
    fn test_jsonl_shape() {
        let mut trace = GenerationTrace::new("ex-1");
        trace.record(Stage::Midi, "Encoded");
        let text = trace.to_jsonl().unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"stage\":\"midi\""));
        assert!(text.contains("\"exerciseId\":\"ex-1\""));
        assert!(text.contains("\"elapsedMs\""));

        let parsed = parse_trace(&text).unwrap();
        assert_eq!(parsed, trace.entries());
    }

    #[test]
    fn test_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(path.clone());

        let mut first = GenerationTrace::new("ex-a");
        first.record(Stage::Parse, "one");
        writer.write_batch(first.entries()).unwrap();

        let mut second = GenerationTrace::new("ex-a");
        second.record(Stage::Notation, "two");
        second.record(Stage::Persist, "three");
        writer.write_batch(second.entries()).unwrap();

        let entries = read_trace_file(writer.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].stage, Stage::Persist);
    }

    #[test]
    fn test_bad_line_is_an_error() {
        assert!(matches!(parse_trace("{\"stage\":"), Err(TraceError::Serialization(_))));
        assert!(parse_trace("\n\n").unwrap().is_empty());
    }
}
