// Sample scales - Bundled one-octave scale files per instrument
// Each scale goes up and back down in 500 ms steps with a short gap between notes

use std::path::{Path, PathBuf};

use super::export::{calculate_ticks_per_ms, encode_timed, MidiExportOptions, TimedNote};
use super::instruments;
use super::MidiResult;
use crate::theory::TimeSignature;

pub const SAMPLE_VELOCITY: u8 = 80;
pub const NOTE_INTERVAL_MS: f64 = 500.0;
pub const NOTE_GAP_MS: f64 = 50.0;

/// A bundled scale: file suffix, root for strings, root for everything else, steps
pub struct SampleScale {
    pub name: &'static str,
    pub string_root: u8,
    pub root: u8,
    pub steps: [u8; 8],
}

const MAJOR_STEPS: [u8; 8] = [0, 2, 4, 5, 7, 9, 11, 12];
const MINOR_STEPS: [u8; 8] = [0, 2, 3, 5, 7, 8, 10, 12];

pub const SAMPLE_SCALES: [SampleScale; 4] = [
    SampleScale {
        name: "c-major",
        string_root: 60,
        root: 48,
        steps: MAJOR_STEPS,
    },
    SampleScale {
        name: "g-major",
        string_root: 67,
        root: 55,
        steps: MAJOR_STEPS,
    },
    SampleScale {
        name: "f-major",
        string_root: 65,
        root: 53,
        steps: MAJOR_STEPS,
    },
    SampleScale {
        name: "a-minor",
        string_root: 69,
        root: 57,
        steps: MINOR_STEPS,
    },
];

/// Violin, viola and cello play the scales an octave higher
fn is_bowed_string(instrument: &str) -> bool {
    matches!(instrument, "violin" | "viola" | "cello")
}

/// Note numbers for a scale on an instrument: ascending, then descending without repeating the top
pub fn scale_keys(scale: &SampleScale, instrument: &str) -> Vec<u8> {
    let root = if is_bowed_string(&instruments::normalize_name(instrument)) {
        scale.string_root
    } else {
        scale.root
    };
    let up = scale.steps.iter().map(|s| root + s);
    let down = scale.steps.iter().rev().skip(1).map(|s| root + s);
    up.chain(down).collect()
}

/// Render one sample scale as MIDI bytes
pub fn sample_scale_midi(scale: &SampleScale, instrument: &str) -> MidiResult<Vec<u8>> {
    let options = MidiExportOptions {
        track_name: Some(format!("{} {}", instruments::display_name(instrument), scale.name)),
        program: instruments::program_for(instrument),
        ..MidiExportOptions::default()
    };
    let ticks_per_ms = calculate_ticks_per_ms(options.tempo_bpm, options.ppq);

    let keys = scale_keys(scale, instrument);
    let notes: Vec<TimedNote> = keys
        .iter()
        .enumerate()
        .map(|(i, &key)| TimedNote {
            key,
            start: (i as f64 * NOTE_INTERVAL_MS * ticks_per_ms).round() as u32,
            length: ((NOTE_INTERVAL_MS - NOTE_GAP_MS) * ticks_per_ms).round() as u32,
            velocity: SAMPLE_VELOCITY,
        })
        .collect();
    let end = (keys.len() as f64 * NOTE_INTERVAL_MS * ticks_per_ms).round() as u32;

    encode_timed(&notes, end, TimeSignature::default(), &options)
}

/// Write every sample scale for every instrument with bundled samples under `dir`,
/// as `<dir>/<folder>/<prefix>-scale-<name>.mid`
pub fn write_samples(dir: &Path) -> MidiResult<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (instrument, folder, prefix) in instruments::sample_targets() {
        let folder_path = dir.join(folder);
        std::fs::create_dir_all(&folder_path)?;

        for scale in &SAMPLE_SCALES {
            let bytes = sample_scale_midi(scale, instrument)?;
            let path = folder_path.join(format!("{}-scale-{}.mid", prefix, scale.name));
            std::fs::write(&path, &bytes)?;
            log::info!("Generated MIDI sample: {}", path.display());
            written.push(path);
        }
    }

    Ok(written)
}
