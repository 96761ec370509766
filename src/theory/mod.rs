// Music theory primitives
// Pitches, keys, scales, intervals, meters and note values shared by the generator and encoders

pub mod key;
pub mod meter;
pub mod pitch;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TheoryError {
    #[error("Invalid note name: {0}")]
    InvalidNote(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid time signature: {0}")]
    InvalidTimeSignature(String),
    #[error("MIDI note out of range: {0}")]
    OutOfRange(i32),
}

// Re-export main types
pub use key::{Interval, Key, Mode, Scale, ScaleKind};
pub use meter::{NoteValue, TimeSignature};
pub use pitch::{Pitch, Step};
