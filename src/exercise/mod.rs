// Exercise module - Parameters, scores and generation
// Turns form parameters into a bar-complete score, either procedurally or from model text

pub mod generator;
pub mod metadata;
pub mod note_text;
pub mod params;
pub mod score;

// Re-export main types
pub use generator::{generate_score, random_seed};
pub use metadata::{ExerciseMetadata, GeneratedExercise, Source};
pub use note_text::{build_score_from_tokens, parse_note_text, BuiltScore, NoteToken, ParsedNoteText};
pub use params::{ExerciseParameters, ExerciseSpec, Focus, Level, ParamError};
pub use score::{Measure, NoteSequence, Score, ScoreNote, SequencedNote, DIVISIONS};
