// Render Engine - Audio previews of exercises
// Additive synthesis per instrument family, mixed to mono and written as 16-bit WAV

pub mod effects;
pub mod mixer;
pub mod synth;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write WAV: {0}")]
    Wav(#[from] hound::Error),

    #[error("Divisions per quarter must be positive")]
    ZeroDivisions,

    #[error("Preview of {0:.1}s exceeds the {1:.0}s limit")]
    TooLong(f64, f64),
}

pub type RenderResult<T> = Result<T, RenderError>;

// Re-export main types
pub use mixer::{render_preview, to_wav, PreviewSettings};
