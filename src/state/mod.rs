// State management module
// SQLite records of generated exercises and their artifact files on disk

pub mod db;
pub mod models;
pub mod queries;
pub mod storage;

pub use db::{init_db, open_in_memory, DbConnection, DbError, DbResult};
pub use models::{Artifact, ArtifactKind, ExerciseRecord, ExerciseSummary};
pub use queries::{
    create_artifact, create_exercise, delete_exercise, find_artifact, get_exercise, list_artifacts,
    list_exercises,
};
pub use storage::{calculate_sha256, Storage, StorageError};
