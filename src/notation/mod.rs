// Notation module - MusicXML documents for exercises
// Writes partwise scores and metadata documents, and reads scores back into note sequences

pub mod metadata;
pub mod reader;
pub mod templates;
pub mod writer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotationError {
    #[error("Invalid MusicXML: {0}")]
    Parse(String),

    #[error("MusicXML document has no parts")]
    NoParts,

    #[error("MusicXML document contains no playable notes")]
    NoNotes,
}

pub type NotationResult<T> = Result<T, NotationError>;

// Re-export main types
pub use metadata::write_metadata_xml;
pub use reader::{read_score, ReadScore};
pub use templates::scale_fallback_score;
pub use writer::{write_score, ScoreHeader, COMPOSER, MODEL_COMPOSER};

/// Escape text content and attribute values
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
