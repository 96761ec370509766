// Score model - Measures of pitched notes and rests
// Shared by the generator, MusicXML writer, MIDI encoder and audio preview

use serde::{Deserialize, Serialize};

use crate::theory::{Key, NoteValue, Pitch, TimeSignature};

/// Divisions per quarter note used for generated scores (sixteenth-note resolution)
pub const DIVISIONS: u32 = 4;

/// A note or rest with a duration in divisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreNote {
    /// None for a rest
    pub pitch: Option<Pitch>,
    pub duration: u32,
}

impl ScoreNote {
    pub fn note(pitch: Pitch, duration: u32) -> Self {
        ScoreNote {
            pitch: Some(pitch),
            duration,
        }
    }

    pub fn rest(duration: u32) -> Self {
        ScoreNote {
            pitch: None,
            duration,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    /// 1-based measure number
    pub number: u32,
    pub notes: Vec<ScoreNote>,
}

impl Measure {
    pub fn new(number: u32) -> Self {
        Measure {
            number,
            notes: Vec::new(),
        }
    }

    /// Sum of note durations in divisions
    pub fn duration(&self) -> u32 {
        self.notes.iter().map(|n| n.duration).sum()
    }
}

/// A single-part exercise score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub title: String,
    /// Instrument table key ("trumpet", "alto_sax")
    pub instrument: String,
    /// Divisions per quarter note
    pub divisions: u32,
    pub key: Key,
    pub time: TimeSignature,
    pub tempo_bpm: u16,
    pub measures: Vec<Measure>,
}

impl Score {
    pub fn new(title: &str, instrument: &str, key: Key, time: TimeSignature, tempo_bpm: u16) -> Self {
        Score {
            title: title.to_string(),
            instrument: instrument.to_string(),
            divisions: DIVISIONS,
            key,
            time,
            tempo_bpm,
            measures: Vec::new(),
        }
    }

    /// Length of one full measure in divisions
    pub fn measure_length(&self) -> u32 {
        self.time.measure_divisions(self.divisions)
    }

    pub fn notes(&self) -> impl Iterator<Item = &ScoreNote> {
        self.measures.iter().flat_map(|m| m.notes.iter())
    }

    /// Number of pitched (non-rest) notes
    pub fn sounding_count(&self) -> usize {
        self.notes().filter(|n| !n.is_rest()).count()
    }

    pub fn total_divisions(&self) -> u32 {
        self.measures.iter().map(|m| m.duration()).sum()
    }

    /// Every measure is filled exactly and every duration has a written value
    pub fn is_well_formed(&self) -> bool {
        let length = self.measure_length();
        self.measures.iter().all(|m| {
            m.duration() == length
                && m.notes
                    .iter()
                    .all(|n| NoteValue::from_divisions(n.duration, self.divisions).is_some())
        })
    }

    /// Flatten to MIDI note numbers; pitches outside 0..=127 become rests
    pub fn to_sequence(&self) -> NoteSequence {
        let mut dropped = 0;
        let notes = self
            .notes()
            .map(|n| {
                let key = match n.pitch {
                    Some(p) => match p.to_midi() {
                        Ok(k) => Some(k),
                        Err(_) => {
                            dropped += 1;
                            None
                        }
                    },
                    None => None,
                };
                SequencedNote {
                    key,
                    duration: n.duration,
                }
            })
            .collect();

        NoteSequence {
            divisions: self.divisions,
            notes,
            dropped,
        }
    }
}

/// Split a gap into the fewest writable rests, longest first
pub fn rest_fill(gap: u32, divisions: u32) -> Vec<ScoreNote> {
    let mut rests = Vec::new();
    let mut left = gap;
    for value in NoteValue::ALL {
        let length = value.divisions(divisions);
        if length == 0 {
            continue;
        }
        while left >= length {
            rests.push(ScoreNote::rest(length));
            left -= length;
        }
    }
    rests
}

/// One entry of a flattened note sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedNote {
    /// MIDI note number, None for a rest
    pub key: Option<u8>,
    /// Length in divisions
    pub duration: u32,
}

/// Monophonic note sequence, the common input of the MIDI encoder and the audio preview
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteSequence {
    /// Divisions per quarter note
    pub divisions: u32,
    pub notes: Vec<SequencedNote>,
    /// Notes that could not be represented and were left out
    pub dropped: usize,
}

impl NoteSequence {
    pub fn total_divisions(&self) -> u32 {
        self.notes.iter().map(|n| n.duration).sum()
    }

    /// Number of pitched notes
    pub fn sounding_count(&self) -> usize {
        self.notes.iter().filter(|n| n.key.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::Step;

    fn c_major_bar() -> Score {
        let mut score = Score::new("Test", "piano", Key::default(), TimeSignature::default(), 120);
        let mut m = Measure::new(1);
        for step in [Step::C, Step::D, Step::E] {
            m.notes.push(ScoreNote::note(Pitch::new(step, 0, 4), 4));
        }
        m.notes.push(ScoreNote::rest(4));
        score.measures.push(m);
        score
    }

    #[test]
    fn test_measure_duration() {
        let score = c_major_bar();
        assert_eq!(score.measure_length(), 16);
        assert_eq!(score.measures[0].duration(), 16);
        assert!(score.is_well_formed());
        assert_eq!(score.sounding_count(), 3);
    }

    #[test]
    fn test_underfilled_measure_is_not_well_formed() {
        let mut score = c_major_bar();
        score.measures[0].notes.pop();
        assert!(!score.is_well_formed());
    }

    #[test]
    fn test_to_sequence() {
        let seq = c_major_bar().to_sequence();
        assert_eq!(seq.divisions, DIVISIONS);
        let keys: Vec<_> = seq.notes.iter().map(|n| n.key).collect();
        assert_eq!(keys, [Some(60), Some(62), Some(64), None]);
        assert_eq!(seq.total_divisions(), 16);
        assert_eq!(seq.dropped, 0);
    }

    #[test]
    fn test_rest_fill() {
        let rests: Vec<u32> = rest_fill(7, DIVISIONS).iter().map(|r| r.duration).collect();
        assert_eq!(rests, [4, 2, 1]);
        assert!(rest_fill(0, DIVISIONS).is_empty());
        assert_eq!(rest_fill(16, DIVISIONS).len(), 1);
    }

    #[test]
    fn test_to_sequence_drops_out_of_range() {
        let mut score = c_major_bar();
        score.measures[0].notes[0] = ScoreNote::note(Pitch::new(Step::B, 0, 9), 4);
        let seq = score.to_sequence();
        assert_eq!(seq.dropped, 1);
        assert_eq!(seq.notes[0].key, None);
        assert_eq!(seq.sounding_count(), 2);
    }
}
