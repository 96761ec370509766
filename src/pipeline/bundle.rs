// Exercise bundle - Every artifact of one exercise, built in memory before it is stored

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use super::compose::Composition;
use super::trace::{GenerationTrace, Stage, TraceWriter};
use super::PipelineResult;
use crate::config::MidiConfig;
use crate::exercise::metadata::encode_midi_data;
use crate::exercise::{ExerciseMetadata, ExerciseParameters, ExerciseSpec, GeneratedExercise};
use crate::midi::{encode_score, MidiExportOptions};
use crate::notation::{write_metadata_xml, write_score, ScoreHeader};
use crate::render::{render_preview, to_wav, PreviewSettings, RenderError};
use crate::state::ExerciseRecord;

/// Encoder and preview settings shared by every exercise
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub midi: MidiExportOptions,
    pub preview: PreviewSettings,
    /// Skip audio rendering entirely
    pub render_audio: bool,
}

impl BuildOptions {
    pub fn from_config(midi: &MidiConfig) -> Self {
        BuildOptions {
            midi: MidiExportOptions {
                ppq: midi.ppq,
                tempo_bpm: midi.tempo_bpm as f64,
                velocity: midi.velocity,
                ..MidiExportOptions::default()
            },
            preview: PreviewSettings::default(),
            render_audio: true,
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions::from_config(&MidiConfig::default())
    }
}

#[derive(Debug)]
pub struct ExerciseBundle {
    pub exercise: GeneratedExercise,
    pub record: ExerciseRecord,
    pub midi: Vec<u8>,
    pub metadata_xml: String,
    /// None when the preview was skipped
    pub wav: Option<Vec<u8>>,
    pub trace: GenerationTrace,
}

/// Notation, MIDI, preview and metadata for a composed score
pub fn build_bundle(
    exercise_id: &str,
    spec: &ExerciseSpec,
    params: &ExerciseParameters,
    composition: Composition,
    mut trace: GenerationTrace,
    options: &BuildOptions,
) -> PipelineResult<ExerciseBundle> {
    let Composition {
        score,
        source,
        composer,
        seed,
        tips,
    } = composition;
    let generated_at = Utc::now();

    let music_xml = write_score(&score, &ScoreHeader::new(composer, generated_at.date_naive()));
    trace.record_with(
        Stage::Notation,
        "MusicXML written",
        serde_json::json!({ "measures": score.measures.len(), "bytes": music_xml.len() }),
    );

    let midi = encode_score(&score, &options.midi)?;
    trace.record_with(
        Stage::Midi,
        "MIDI encoded",
        serde_json::json!({ "notes": score.sounding_count(), "bytes": midi.len(), "ppq": options.midi.ppq }),
    );

    let wav = if options.render_audio {
        let settings = PreviewSettings {
            tempo_bpm: score.tempo_bpm as f64,
            ..options.preview.clone()
        };
        match render_preview(&score.to_sequence(), &score.instrument, &settings) {
            Ok(samples) => {
                let wav = to_wav(&samples, settings.sample_rate)?;
                trace.record_with(
                    Stage::Preview,
                    "Preview rendered",
                    serde_json::json!({ "samples": samples.len(), "sampleRate": settings.sample_rate }),
                );
                Some(wav)
            }
            Err(RenderError::TooLong(seconds, limit)) => {
                log::warn!("Skipping preview for {}: {:.0}s is over {:.0}s", exercise_id, seconds, limit);
                trace.record(Stage::Preview, format!("Preview skipped, {:.0}s is too long", seconds));
                None
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        trace.record(Stage::Preview, "Preview disabled");
        None
    };

    let metadata = ExerciseMetadata::from_spec(spec, generated_at);
    let metadata_xml = write_metadata_xml(exercise_id, &metadata);

    let record = ExerciseRecord {
        id: exercise_id.to_string(),
        created_at: generated_at,
        title: metadata.title.clone(),
        instrument: metadata.instrument.clone(),
        key: metadata.key.clone(),
        time_signature: metadata.time_signature.clone(),
        difficulty: metadata.difficulty.clone(),
        focus: metadata.focus.clone(),
        bars: metadata.bars,
        source,
        seed,
        params_json: serde_json::to_string(params)?,
    };

    let exercise = GeneratedExercise {
        exercise_id: exercise_id.to_string(),
        midi_data: encode_midi_data(&midi),
        music_xml,
        metadata,
        source,
        suggested_improvements: tips,
    };

    Ok(ExerciseBundle {
        exercise,
        record,
        midi,
        metadata_xml,
        wav,
        trace,
    })
}

impl ExerciseBundle {
    /// Write `<stem>.musicxml`, `.mid`, `.wav`, `.json`, `.metadata.xml` and `.trace.jsonl`
    /// into `dir`
    pub fn write_to_dir(&self, dir: &Path, stem: &str) -> PipelineResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        let mut put = |name: String, data: &[u8]| -> PipelineResult<()> {
            let path = dir.join(name);
            fs::write(&path, data)?;
            written.push(path);
            Ok(())
        };

        put(format!("{stem}.musicxml"), self.exercise.music_xml.as_bytes())?;
        put(format!("{stem}.mid"), &self.midi)?;
        if let Some(wav) = &self.wav {
            put(format!("{stem}.wav"), wav)?;
        }
        put(format!("{stem}.json"), &serde_json::to_vec_pretty(&self.exercise)?)?;
        put(format!("{stem}.metadata.xml"), self.metadata_xml.as_bytes())?;

        let trace_path = dir.join(format!("{stem}.trace.jsonl"));
        TraceWriter::new(trace_path.clone()).write_batch(self.trace.entries())?;
        written.push(trace_path);

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::Source;
    use crate::midi::summarize;
    use crate::pipeline::compose::compose_procedural;
    use crate::pipeline::trace::read_trace_file;
    use tempfile::TempDir;

    fn params() -> ExerciseParameters {
        ExerciseParameters {
            instrument: Some("violin".to_string()),
            key: Some("D".to_string()),
            meter_numerator: Some("3".to_string()),
            bars: Some("4".to_string()),
            seed: Some(3),
            ..Default::default()
        }
    }

    fn bundle(options: &BuildOptions) -> ExerciseBundle {
        let params = params();
        let spec = params.parse().unwrap();
        let composition = compose_procedural(&spec, Source::Procedural);
        build_bundle("ex-00c0ffee", &spec, &params, composition, GenerationTrace::new("ex-00c0ffee"), options).unwrap()
    }

    #[test]
    fn test_bundle_contents() {
        let bundle = bundle(&BuildOptions::default());
        let exercise = &bundle.exercise;

        assert_eq!(exercise.exercise_id, "ex-00c0ffee");
        assert_eq!(exercise.source, Source::Procedural);
        assert_eq!(exercise.metadata.title, "Scales Exercise in D");
        assert_eq!(exercise.metadata.time_signature, "3/4");
        assert!(exercise.music_xml.contains("<beats>3</beats>"));
        assert_eq!(exercise.midi_bytes().unwrap(), bundle.midi);

        let summary = summarize(&bundle.midi).unwrap();
        assert_eq!(summary.ppq, 480);
        assert_eq!(summary.time_signature, Some((3, 4)));

        assert!(bundle.wav.as_ref().unwrap().starts_with(b"RIFF"));
        assert!(bundle.metadata_xml.contains("ex-00c0ffee"));
        assert_eq!(bundle.record.seed, Some(3));
        assert_eq!(bundle.record.bars, 4);

        let stages: Vec<Stage> = bundle.trace.entries().iter().map(|e| e.stage).collect();
        assert_eq!(stages, [Stage::Notation, Stage::Midi, Stage::Preview]);
    }

    #[test]
    fn test_preview_can_be_disabled() {
        let options = BuildOptions {
            render_audio: false,
            ..BuildOptions::default()
        };
        let bundle = bundle(&options);
        assert!(bundle.wav.is_none());
    }

    #[test]
    fn test_write_to_dir() {
        let temp_dir = TempDir::new().unwrap();
        let bundle = bundle(&BuildOptions::default());
        let written = bundle.write_to_dir(temp_dir.path(), "violin-d").unwrap();
        assert_eq!(written.len(), 6);

        let json = std::fs::read(temp_dir.path().join("violin-d.json")).unwrap();
        let back: GeneratedExercise = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, bundle.exercise);

        let trace = read_trace_file(&temp_dir.path().join("violin-d.trace.jsonl")).unwrap();
        assert_eq!(trace.len(), 3);
    }
}
