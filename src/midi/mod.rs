// MIDI module - Standard MIDI File output for exercises
// Encoder, MusicXML conversion, instrument table and bundled sample scales

pub mod convert;
pub mod export;
pub mod instruments;
pub mod samples;

use thiserror::Error;

use crate::notation::NotationError;

#[derive(Error, Debug)]
pub enum MidiError {
    #[error("Failed to write MIDI: {0}")]
    Write(String),

    #[error("Failed to parse MIDI: {0}")]
    Parse(String),

    #[error("Divisions per quarter must be positive")]
    ZeroDivisions,

    #[error("Invalid PPQ {0} (must be 1-32767)")]
    InvalidPpq(u16),

    #[error("Invalid tempo {0} BPM")]
    InvalidTempo(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Notation(#[from] NotationError),
}

pub type MidiResult<T> = Result<T, MidiError>;

// Re-export main types
pub use convert::{musicxml_to_midi, simple_midi, Conversion, SimpleMidi, DEFAULT_PATTERN};
pub use export::{encode_score, encode_sequence, summarize, MidiExportOptions, MidiSummary};
