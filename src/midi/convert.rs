// MIDI conversion - MusicXML documents and plain note-name lists to MIDI bytes

use serde::Serialize;

use super::export::{encode_sequence, MidiExportOptions};
use super::MidiResult;
use crate::exercise::score::{NoteSequence, SequencedNote};
use crate::notation;
use crate::theory::{Pitch, TimeSignature};

/// One octave of C major in quarter notes
pub const DEFAULT_PATTERN: [&str; 8] = ["C4", "D4", "E4", "F4", "G4", "A4", "B4", "C5"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Sounding notes written
    pub notes: usize,
    /// Notes the reader could not use
    pub dropped: usize,
    /// Time signature written to the file
    pub time: TimeSignature,
}

/// Read a MusicXML document and encode it. An explicit time signature overrides the one
/// declared in the document; 4/4 when neither is present.
pub fn musicxml_to_midi(
    xml: &str,
    time: Option<TimeSignature>,
    options: &MidiExportOptions,
) -> MidiResult<Conversion> {
    let notation::ReadScore { sequence, time: declared } = notation::read_score(xml)?;
    let time = time.or(declared).unwrap_or_default();
    if sequence.dropped > 0 {
        log::warn!("Skipped {} notes while reading MusicXML", sequence.dropped);
    }
    let bytes = encode_sequence(&sequence, time, options)?;

    Ok(Conversion {
        bytes,
        notes: sequence.sounding_count(),
        dropped: sequence.dropped,
        time,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleMidi {
    pub bytes: Vec<u8>,
    /// Names that are not notes
    pub skipped: Vec<String>,
}

/// Quarter notes from names like "C4" or "Bb3"
pub fn simple_midi(pattern: &[&str], time: TimeSignature, options: &MidiExportOptions) -> MidiResult<SimpleMidi> {
    let mut skipped = Vec::new();
    let notes = pattern
        .iter()
        .filter_map(|name| match Pitch::parse(name).and_then(|p| p.to_midi()) {
            Ok(key) => Some(SequencedNote {
                key: Some(key),
                duration: 1,
            }),
            Err(_) => {
                skipped.push(name.to_string());
                None
            }
        })
        .collect();
    let sequence = NoteSequence {
        divisions: 1,
        notes,
        dropped: skipped.len(),
    };

    Ok(SimpleMidi {
        bytes: encode_sequence(&sequence, time, options)?,
        skipped,
    })
}
