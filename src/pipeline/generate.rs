// Exercise pipeline - Generate, store and look up exercises
// parse -> compose -> notation -> midi -> preview -> persist

use super::bundle::{build_bundle, BuildOptions, ExerciseBundle};
use super::compose::{compose_from_answer, compose_procedural, composer_messages, Composition};
use super::trace::{parse_trace, GenerationTrace, Stage, TraceEntry};
use super::{PipelineError, PipelineResult};
use crate::config::Config;
use crate::exercise::metadata::{exercise_title, new_exercise_id};
use crate::exercise::{ExerciseParameters, ExerciseSpec, GeneratedExercise, Source};
use crate::inference::{ApiToken, ChatParams, InferenceClient};
use crate::state::storage::read_file;
use crate::state::{
    create_artifact, create_exercise, delete_exercise, find_artifact, get_exercise, list_exercises, Artifact,
    ArtifactKind, DbConnection, ExerciseSummary, Storage,
};

#[derive(Clone)]
pub struct ExercisePipeline {
    db: DbConnection,
    storage: Storage,
    client: InferenceClient,
    chat_params: ChatParams,
    options: BuildOptions,
    default_tempo: u16,
}

impl ExercisePipeline {
    pub fn new(db: DbConnection, storage: Storage, client: InferenceClient, config: &Config) -> Self {
        ExercisePipeline {
            db,
            storage,
            client,
            chat_params: ChatParams::from_config(&config.inference),
            options: BuildOptions::from_config(&config.midi),
            default_tempo: config.midi.tempo_bpm,
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn db(&self) -> &DbConnection {
        &self.db
    }

    fn parse(&self, params: &ExerciseParameters, trace: &mut GenerationTrace) -> PipelineResult<ExerciseSpec> {
        let spec = params.parse_with_tempo(self.default_tempo)?;
        trace.record_with(
            Stage::Parse,
            "Parameters accepted",
            serde_json::json!({
                "instrument": spec.instrument,
                "key": spec.key_name,
                "timeSignature": spec.time.to_string(),
                "bars": spec.bars,
                "tempo": spec.tempo_bpm,
            }),
        );
        Ok(spec)
    }

    /// Build everything for a procedural exercise without storing it
    pub fn build(&self, params: &ExerciseParameters) -> PipelineResult<ExerciseBundle> {
        let exercise_id = new_exercise_id();
        let mut trace = GenerationTrace::new(&exercise_id);
        let spec = self.parse(params, &mut trace)?;

        let composition = compose_procedural(&spec, Source::Procedural);
        trace.record_with(
            Stage::Compose,
            "Procedural score",
            serde_json::json!({ "seed": composition.seed, "notes": composition.score.sounding_count() }),
        );

        build_bundle(&exercise_id, &spec, params, composition, trace, &self.options)
    }

    /// Procedural exercise, stored
    pub fn generate(&self, params: &ExerciseParameters) -> PipelineResult<GeneratedExercise> {
        let bundle = self.build(params)?;
        self.persist(bundle)
    }

    /// Ask the model for the notes. Without a token, on model failure, or when the answer
    /// has too few notes, the procedural score is used and the source is `fallback`.
    /// Rendering and storage run on the blocking pool.
    pub async fn generate_with_model(
        &self,
        params: &ExerciseParameters,
        prompt: &str,
        token: Option<&ApiToken>,
    ) -> PipelineResult<GeneratedExercise> {
        if prompt.trim().is_empty() {
            return Err(PipelineError::MissingPrompt);
        }

        let exercise_id = new_exercise_id();
        let mut trace = GenerationTrace::new(&exercise_id);
        let spec = self.parse(params, &mut trace)?;
        let title = exercise_title(&spec.focus_type, &spec.key_name);

        let from_model = match token {
            None => {
                log::info!("No inference token, composing {} procedurally", exercise_id);
                None
            }
            Some(token) => match self
                .client
                .chat(token, &composer_messages(&spec, prompt), &self.chat_params)
                .await
            {
                Ok(answer) => compose_from_answer(&spec, &answer, &title),
                Err(e) => {
                    log::error!("Error calling {}: {}", self.client.model(), e);
                    None
                }
            },
        };

        let composition = match from_model {
            Some(composition) => {
                trace.record_with(
                    Stage::Compose,
                    "Model score",
                    serde_json::json!({ "model": self.client.model(), "notes": composition.score.sounding_count() }),
                );
                composition
            }
            None => {
                let composition: Composition = compose_procedural(&spec, Source::Fallback);
                trace.record_with(
                    Stage::Compose,
                    "Procedural fallback",
                    serde_json::json!({ "seed": composition.seed }),
                );
                composition
            }
        };

        let pipeline = self.clone();
        let params = params.clone();
        tokio::task::spawn_blocking(move || {
            let bundle = build_bundle(&exercise_id, &spec, &params, composition, trace, &pipeline.options)?;
            pipeline.persist(bundle)
        })
        .await?
    }

    /// Store the row, the files and one artifact row per file. A failure removes what was
    /// already written.
    pub fn persist(&self, bundle: ExerciseBundle) -> PipelineResult<GeneratedExercise> {
        let id = bundle.exercise.exercise_id.clone();
        match self.persist_inner(bundle) {
            Ok(exercise) => Ok(exercise),
            Err(e) => {
                log::error!("Failed to store exercise {}: {}", id, e);
                if let Err(cleanup) = delete_exercise(&self.db, &id) {
                    log::warn!("Cleanup of row {} failed: {}", id, cleanup);
                }
                if let Err(cleanup) = self.storage.remove_exercise(&id) {
                    log::warn!("Cleanup of files for {} failed: {}", id, cleanup);
                }
                Err(e)
            }
        }
    }

    fn persist_inner(&self, bundle: ExerciseBundle) -> PipelineResult<GeneratedExercise> {
        let ExerciseBundle {
            exercise,
            record,
            midi,
            metadata_xml,
            wav,
            mut trace,
        } = bundle;
        let id = exercise.exercise_id.as_str();

        create_exercise(&self.db, &record)?;

        let exercise_json = serde_json::to_vec(&exercise)?;
        let mut files: Vec<(ArtifactKind, &[u8])> = vec![
            (ArtifactKind::MusicXml, exercise.music_xml.as_bytes()),
            (ArtifactKind::Midi, midi.as_slice()),
            (ArtifactKind::Metadata, metadata_xml.as_bytes()),
            (ArtifactKind::Exercise, exercise_json.as_slice()),
        ];
        if let Some(wav) = &wav {
            files.push((ArtifactKind::Audio, wav.as_slice()));
        }

        for (kind, data) in &files {
            self.store(id, *kind, data)?;
        }
        trace.record_with(
            Stage::Persist,
            "Exercise stored",
            serde_json::json!({ "artifacts": files.len() + 1, "dir": self.storage.exercise_dir(id)?.display().to_string() }),
        );
        let trace_text = trace.to_jsonl()?;
        self.store(id, ArtifactKind::Trace, trace_text.as_bytes())?;

        log::info!(
            "Stored exercise {} ({}, {} artifacts)",
            id,
            exercise.source.as_str(),
            files.len() + 1
        );
        Ok(exercise)
    }

    fn store(&self, id: &str, kind: ArtifactKind, data: &[u8]) -> PipelineResult<Artifact> {
        let (path, sha256) = self.storage.store_file(id, kind.file_name(), data)?;
        Ok(create_artifact(
            &self.db,
            id,
            kind,
            path.to_string_lossy().to_string(),
            sha256,
            data.len() as i64,
        )?)
    }

    pub fn list(&self) -> PipelineResult<Vec<ExerciseSummary>> {
        Ok(list_exercises(&self.db)?)
    }

    /// Artifact row and file contents, or None when the exercise or the artifact is missing
    pub fn artifact(&self, id: &str, kind: ArtifactKind) -> PipelineResult<Option<(Artifact, Vec<u8>)>> {
        let Some(artifact) = find_artifact(&self.db, id, kind)? else {
            return Ok(None);
        };
        let data = read_file(&artifact.path)?;
        Ok(Some((artifact, data)))
    }

    /// The stored response payload
    pub fn load(&self, id: &str) -> PipelineResult<Option<GeneratedExercise>> {
        if get_exercise(&self.db, id)?.is_none() {
            return Ok(None);
        }
        match self.artifact(id, ArtifactKind::Exercise)? {
            Some((_, data)) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Err(PipelineError::MissingArtifact(id.to_string(), ArtifactKind::Exercise)),
        }
    }

    pub fn trace(&self, id: &str) -> PipelineResult<Option<Vec<TraceEntry>>> {
        match self.artifact(id, ArtifactKind::Trace)? {
            Some((_, data)) => Ok(Some(parse_trace(&String::from_utf8_lossy(&data))?)),
            None => Ok(None),
        }
    }

    /// Remove the row (artifact rows cascade) and the files. False when it did not exist.
    pub fn delete(&self, id: &str) -> PipelineResult<bool> {
        let existed = delete_exercise(&self.db, id)?;
        if existed {
            self.storage.remove_exercise(id)?;
            log::info!("Deleted exercise {}", id);
        }
        Ok(existed)
    }
}
