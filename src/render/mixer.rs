// Preview mixer - Lay exercise notes on a timeline and bounce them to WAV

use serde::{Deserialize, Serialize};

use super::effects::{normalize_peak, soft_limit};
use super::synth::{render_note, timbre_for};
use super::{RenderError, RenderResult};
use crate::exercise::score::NoteSequence;
use crate::midi::instruments::{self, Family};

pub const MAX_PREVIEW_SECONDS: f64 = 600.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSettings {
    pub sample_rate: u32,
    pub tempo_bpm: f64,
    pub master_volume: f32,
    /// Fraction of each note left silent before the next one
    pub articulation_gap: f64,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            tempo_bpm: 120.0,
            master_volume: 0.85,
            articulation_gap: 0.1,
        }
    }
}

/// Convert MIDI note number to frequency (Hz)
pub fn midi_to_freq(midi_note: u8) -> f64 {
    // A4 = 440 Hz = MIDI note 69
    440.0 * 2.0_f64.powf((midi_note as f64 - 69.0) / 12.0)
}

fn family_for(instrument: &str) -> Family {
    instruments::program_for(instrument)
        .map(Family::from_program)
        .unwrap_or(Family::Piano)
}

/// Mono samples in -1.0..=1.0 for the whole sequence; rests are silence
pub fn render_preview(sequence: &NoteSequence, instrument: &str, settings: &PreviewSettings) -> RenderResult<Vec<f32>> {
    if sequence.divisions == 0 {
        return Err(RenderError::ZeroDivisions);
    }
    let seconds_per_division = 60.0 / settings.tempo_bpm / sequence.divisions as f64;
    let total_seconds = sequence.total_divisions() as f64 * seconds_per_division;
    if total_seconds > MAX_PREVIEW_SECONDS {
        return Err(RenderError::TooLong(total_seconds, MAX_PREVIEW_SECONDS));
    }

    let rate = settings.sample_rate as f64;
    let mut output = vec![0.0f32; (total_seconds * rate).ceil() as usize];
    let timbre = timbre_for(family_for(instrument));

    let mut start = 0.0;
    for note in &sequence.notes {
        let length = note.duration as f64 * seconds_per_division;
        if let Some(key) = note.key {
            let sounding = length * (1.0 - settings.articulation_gap.clamp(0.0, 0.9));
            let rendered = render_note(midi_to_freq(key), sounding, &timbre, settings.sample_rate);
            let offset = (start * rate).round() as usize;
            for (slot, sample) in output.iter_mut().skip(offset).zip(rendered) {
                *slot += sample;
            }
        }
        start += length;
    }

    normalize_peak(&mut output, settings.master_volume.clamp(0.0, 1.0));
    for sample in output.iter_mut() {
        *sample = soft_limit(*sample, 0.95);
    }

    log::debug!(
        "Rendered preview: {} notes, {:.2}s @ {}Hz",
        sequence.sounding_count(),
        total_seconds,
        settings.sample_rate
    );
    Ok(output)
}

/// 16-bit mono PCM WAV bytes
pub fn to_wav(samples: &[f32], sample_rate: u32) -> RenderResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let int_sample = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            writer.write_sample(int_sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::score::SequencedNote;

    fn sequence() -> NoteSequence {
        NoteSequence {
            divisions: 4,
            notes: vec![
                SequencedNote { key: Some(60), duration: 4 },
                SequencedNote { key: None, duration: 4 },
                SequencedNote { key: Some(67), duration: 8 },
            ],
            dropped: 0,
        }
    }

    #[test]
    fn test_midi_to_freq() {
        assert!((midi_to_freq(69) - 440.0).abs() < 0.01);
        assert!((midi_to_freq(57) - 220.0).abs() < 0.01);
        assert!((midi_to_freq(81) - 880.0).abs() < 0.01);
    }

    #[test]
    fn test_preview_length_and_rest() {
        let settings = PreviewSettings {
            sample_rate: 8000,
            ..PreviewSettings::default()
        };
        let samples = render_preview(&sequence(), "trumpet", &settings).unwrap();
        // Four quarters at 120 BPM
        assert_eq!(samples.len(), 16000);
        // The rest (0.5s..1.0s) is silent
        assert!(samples[4100..7900].iter().all(|&s| s == 0.0));
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.5 && peak <= 0.95);
    }

    #[test]
    fn test_preview_rejects_zero_divisions() {
        let seq = NoteSequence::default();
        assert!(matches!(
            render_preview(&seq, "piano", &PreviewSettings::default()),
            Err(RenderError::ZeroDivisions)
        ));
    }

    #[test]
    fn test_to_wav() {
        let wav = to_wav(&[0.0, 0.5, -0.5, 1.0], 22050).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.len(), 4);
    }
}
