// MusicXML reader - Flatten the first part of a partwise score into a note sequence
// Durations are expressed in the first divisions value found; later changes are rescaled

use musicxml::elements::{AudibleType, MeasureElement, NoteType, PartElement, Time};

use super::{NotationError, NotationResult};
use crate::exercise::score::{NoteSequence, SequencedNote};
use crate::theory::{Pitch, Step, TimeSignature};

/// MusicXML assumes one division per quarter until an attributes block says otherwise
const DEFAULT_DIVISIONS: u32 = 1;

/// Notes of the first part plus the first time signature the document declares
#[derive(Debug, Clone, PartialEq)]
pub struct ReadScore {
    pub sequence: NoteSequence,
    pub time: Option<TimeSignature>,
}

/// Read a score. Grace notes, cue notes, unpitched notes and pitches outside the MIDI
/// range are left out and counted in `dropped`. Chord members are read as sequential notes.
pub fn read_score(xml: &str) -> NotationResult<ReadScore> {
    let score = musicxml::read_score_data_partwise(xml.as_bytes().to_vec())
        .map_err(NotationError::Parse)?;
    let part = score.content.part.first().ok_or(NotationError::NoParts)?;

    let mut sequence = NoteSequence {
        divisions: 0,
        ..NoteSequence::default()
    };
    let mut current_divisions = DEFAULT_DIVISIONS;
    let mut time = None;

    for element in &part.content {
        let PartElement::Measure(measure) = element else {
            continue;
        };
        for item in &measure.content {
            match item {
                MeasureElement::Attributes(attributes) => {
                    if time.is_none() {
                        time = attributes.content.time.iter().find_map(time_signature);
                    }
                    if let Some(divisions) = &attributes.content.divisions {
                        let value = divisions.content.0 as u32;
                        if value > 0 {
                            current_divisions = value;
                            if sequence.divisions == 0 {
                                sequence.divisions = value;
                            }
                        }
                    }
                }
                MeasureElement::Note(note) => {
                    let NoteType::Normal(ref normal) = note.content.info else {
                        sequence.dropped += 1;
                        continue;
                    };
                    if sequence.divisions == 0 {
                        sequence.divisions = current_divisions;
                    }
                    let duration = rescale(
                        normal.duration.content.0 as u32,
                        current_divisions,
                        sequence.divisions,
                    );

                    let key = match normal.audible {
                        AudibleType::Pitch(ref pitch) => {
                            let step = Step::from_name(&format!("{:?}", pitch.content.step.content));
                            let alter = pitch.content.alter.as_ref().map(|a| a.content.0 as i8).unwrap_or(0);
                            let octave = pitch.content.octave.content.0 as i8;
                            match step.map(|s| Pitch::new(s, alter, octave).to_midi()) {
                                Some(Ok(key)) => Some(key),
                                _ => {
                                    log::debug!("Dropping unreadable pitch in measure");
                                    sequence.dropped += 1;
                                    continue;
                                }
                            }
                        }
                        AudibleType::Rest(_) => None,
                        _ => {
                            sequence.dropped += 1;
                            continue;
                        }
                    };

                    if duration > 0 {
                        sequence.notes.push(SequencedNote { key, duration });
                    }
                }
                _ => {}
            }
        }
    }

    if sequence.sounding_count() == 0 {
        return Err(NotationError::NoNotes);
    }
    Ok(ReadScore { sequence, time })
}

/// Only simple `beats`/`beat-type` pairs are understood; "3+2" and the like are ignored
fn time_signature(time: &Time) -> Option<TimeSignature> {
    let first = time.content.beats.first()?;
    let text = format!("{}/{}", first.beats.content.trim(), first.beat_type.content.trim());
    match TimeSignature::parse(&text) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::debug!("Ignoring time signature {}", text);
            None
        }
    }
}

fn rescale(duration: u32, from: u32, to: u32) -> u32 {
    if from == to || from == 0 {
        duration
    } else {
        ((duration as f64) * (to as f64) / (from as f64)).round() as u32
    }
}
