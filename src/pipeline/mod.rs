// Pipeline module
// Orchestrates exercise generation from request parameters to stored artifacts

pub mod bundle;
pub mod compose;
pub mod generate;
pub mod trace;

use thiserror::Error;

use crate::exercise::ParamError;
use crate::midi::MidiError;
use crate::render::RenderError;
use crate::state::{ArtifactKind, DbError, StorageError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("Prompt is required")]
    MissingPrompt,

    #[error(transparent)]
    Midi(#[from] MidiError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Trace error: {0}")]
    Trace(#[from] trace::TraceError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Exercise {0} has no {1:?} artifact")]
    MissingArtifact(String, ArtifactKind),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

pub use bundle::{build_bundle, BuildOptions, ExerciseBundle};
pub use compose::{compose_procedural, Composition};
pub use generate::ExercisePipeline;
pub use trace::{read_trace_file, GenerationTrace, Stage, TraceEntry, TraceError, TraceWriter};
