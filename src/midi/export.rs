// MIDI Export - Encode exercises as Standard MIDI Files using midly crate
// Format 0, single track: name, tempo, time signature, program change, then the notes

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};

use super::instruments;
use super::{MidiError, MidiResult};
use crate::exercise::score::{NoteSequence, Score};
use crate::theory::TimeSignature;

pub const DEFAULT_PPQ: u16 = 480;
pub const DEFAULT_VELOCITY: u8 = 100;
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// MIDI export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiExportOptions {
    /// Pulses per quarter note (PPQ)
    pub ppq: u16,

    pub tempo_bpm: f64,

    /// Note-On velocity for every note
    pub velocity: u8,

    /// Include tempo metadata
    pub include_tempo: bool,

    /// Include time signature metadata
    pub include_time_signature: bool,

    pub track_name: Option<String>,

    /// General MIDI program sent before the first note
    pub program: Option<u8>,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ppq: DEFAULT_PPQ,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            velocity: DEFAULT_VELOCITY,
            include_tempo: true,
            include_time_signature: true,
            track_name: None,
            program: None,
        }
    }
}

/// A note placed on the tick timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedNote {
    pub key: u8,
    pub start: u32,
    pub length: u32,
    pub velocity: u8,
}

/// Convert a length in MusicXML divisions to ticks: duration / divisions * ppq
pub fn divisions_to_ticks(duration: u32, divisions: u32, ppq: u16) -> u32 {
    if divisions == 0 {
        return 0;
    }
    let ticks = (duration as u64 * ppq as u64 + divisions as u64 / 2) / divisions as u64;
    ticks.min(u32::MAX as u64) as u32
}

/// Calculate ticks per millisecond
pub fn calculate_ticks_per_ms(bpm: f64, ppq: u16) -> f64 {
    // Milliseconds per quarter note
    let ms_per_quarter = 60_000.0 / bpm;
    ppq as f64 / ms_per_quarter
}

/// Microseconds per quarter note for a tempo
pub fn tempo_micros(bpm: f64) -> u32 {
    (60_000_000.0 / bpm).round() as u32
}

/// Encode a whole score, taking tempo, track name and program from it
pub fn encode_score(score: &Score, options: &MidiExportOptions) -> MidiResult<Vec<u8>> {
    let options = MidiExportOptions {
        tempo_bpm: score.tempo_bpm as f64,
        track_name: options.track_name.clone().or_else(|| Some(score.title.clone())),
        program: options.program.or_else(|| instruments::program_for(&score.instrument)),
        ..options.clone()
    };
    let sequence = score.to_sequence();
    if sequence.dropped > 0 {
        log::warn!("{} notes outside the MIDI range were written as rests", sequence.dropped);
    }
    encode_sequence(&sequence, score.time, &options)
}

/// Encode a monophonic sequence; rests advance time
pub fn encode_sequence(
    sequence: &NoteSequence,
    time: TimeSignature,
    options: &MidiExportOptions,
) -> MidiResult<Vec<u8>> {
    if sequence.divisions == 0 {
        return Err(MidiError::ZeroDivisions);
    }

    let mut notes = Vec::with_capacity(sequence.notes.len());
    let mut tick = 0u32;
    for note in &sequence.notes {
        let length = divisions_to_ticks(note.duration, sequence.divisions, options.ppq);
        if let Some(key) = note.key {
            notes.push(TimedNote {
                key,
                start: tick,
                length,
                velocity: options.velocity,
            });
        }
        tick = tick.saturating_add(length);
    }

    encode_timed(&notes, tick, time, options)
}

/// Encode notes already placed on the tick timeline. `end_tick` marks the end of track
/// so that trailing rests keep their length.
pub fn encode_timed(
    notes: &[TimedNote],
    end_tick: u32,
    time: TimeSignature,
    options: &MidiExportOptions,
) -> MidiResult<Vec<u8>> {
    if options.ppq == 0 || options.ppq > 0x7FFF {
        return Err(MidiError::InvalidPpq(options.ppq));
    }
    if !(options.tempo_bpm.is_finite() && options.tempo_bpm > 0.0) {
        return Err(MidiError::InvalidTempo(options.tempo_bpm));
    }

    let header = Header::new(Format::SingleTrack, Timing::Metrical(u15::new(options.ppq)));
    let mut events: Vec<(u32, TrackEventKind)> = Vec::new();

    // Add track name
    if let Some(name) = &options.track_name {
        events.push((0, TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes()))));
    }

    // Add tempo
    if options.include_tempo {
        events.push((0, tempo_event(options.tempo_bpm)));
    }

    // Add time signature
    if options.include_time_signature {
        events.push((0, time_signature_event(time)));
    }

    if let Some(program) = options.program {
        events.push((
            0,
            TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::ProgramChange {
                    program: u7::new(program.min(127)),
                },
            },
        ));
    }

    let mut note_events: Vec<(u32, TrackEventKind)> = Vec::new();
    for note in notes {
        let key = u7::new(note.key.min(127));
        note_events.push((
            note.start,
            TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(note.velocity.min(127)),
                },
            },
        ));
        note_events.push((
            note.start.saturating_add(note.length),
            TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOff { key, vel: u7::new(0) },
            },
        ));
    }
    // Sort by tick; a Note-Off goes before a Note-On at the same tick
    note_events.sort_by_key(|(tick, kind)| (*tick, !is_note_off(kind)));
    events.extend(note_events);

    // Convert to delta times and add to track
    let mut track: Track = Track::new();
    let mut last_tick = 0;
    for (tick, kind) in events {
        let delta = tick.saturating_sub(last_tick);
        track.push(TrackEvent {
            delta: u28::new(delta.min(0x0FFF_FFFF)),
            kind,
        });
        last_tick = tick;
    }

    // End of track
    let delta = end_tick.saturating_sub(last_tick);
    track.push(TrackEvent {
        delta: u28::new(delta.min(0x0FFF_FFFF)),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header,
        tracks: vec![track],
    };

    // Write to bytes
    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| MidiError::Write(e.to_string()))?;

    Ok(bytes)
}

fn is_note_off(kind: &TrackEventKind) -> bool {
    matches!(
        kind,
        TrackEventKind::Midi {
            message: MidiMessage::NoteOff { .. },
            ..
        }
    )
}

/// Tempo meta message
fn tempo_event<'a>(bpm: f64) -> TrackEventKind<'a> {
    TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros(bpm).min(0xFF_FFFF))))
}

/// Time signature meta message: numerator, log2 denominator, 24 clocks per click,
/// 8 thirty-seconds per quarter
fn time_signature_event<'a>(time: TimeSignature) -> TrackEventKind<'a> {
    TrackEventKind::Meta(MetaMessage::TimeSignature(
        time.numerator,
        time.denominator_power(),
        24,
        8,
    ))
}

/// What a MIDI file contains, as read back by midly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiSummary {
    pub format: String,
    pub ppq: u16,
    pub tracks: usize,
    pub notes: usize,
    /// Microseconds per quarter note from the first tempo event
    pub tempo: Option<u32>,
    /// (numerator, denominator) from the first time signature event
    pub time_signature: Option<(u8, u16)>,
    /// Notes in start order
    pub keys: Vec<u8>,
    pub length_ticks: u32,
}

/// Parse MIDI bytes and summarize them
pub fn summarize(bytes: &[u8]) -> MidiResult<MidiSummary> {
    let smf = Smf::parse(bytes).map_err(|e| MidiError::Parse(e.to_string()))?;

    let ppq = match smf.header.timing {
        Timing::Metrical(t) => t.as_int(),
        Timing::Timecode(..) => 0,
    };
    let format = match smf.header.format {
        Format::SingleTrack => "single-track",
        Format::Parallel => "parallel",
        Format::Sequential => "sequential",
    };

    let mut tempo = None;
    let mut time_signature = None;
    let mut keys = Vec::new();
    let mut length_ticks = 0u32;

    for track in &smf.tracks {
        let mut tick = 0u32;
        for event in track {
            tick += event.delta.as_int();
            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(t)) if tempo.is_none() => {
                    tempo = Some(t.as_int());
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(n, d, _, _)) if time_signature.is_none() => {
                    time_signature = Some((n, 1u16 << d.min(15)));
                }
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, vel },
                    ..
                } if vel.as_int() > 0 => {
                    keys.push(key.as_int());
                }
                _ => {}
            }
        }
        length_ticks = length_ticks.max(tick);
    }

    Ok(MidiSummary {
        format: format.to_string(),
        ppq,
        tracks: smf.tracks.len(),
        notes: keys.len(),
        tempo,
        time_signature,
        keys,
        length_ticks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::score::{Measure, ScoreNote, SequencedNote};
    use crate::theory::{Key, Pitch, Step};

    fn sequence(notes: &[(Option<u8>, u32)], divisions: u32) -> NoteSequence {
        NoteSequence {
            divisions,
            notes: notes
                .iter()
                .map(|&(key, duration)| SequencedNote { key, duration })
                .collect(),
            dropped: 0,
        }
    }

    #[test]
    fn test_calculate_ticks_per_ms() {
        let ticks_per_ms = calculate_ticks_per_ms(120.0, 480);

        // At 120 BPM, quarter note = 500ms
        // 480 PPQ / 500ms = 0.96 ticks per ms
        assert!((ticks_per_ms - 0.96).abs() < 0.01);
    }

    #[test]
    fn test_divisions_to_ticks() {
        assert_eq!(divisions_to_ticks(1, 1, 480), 480);
        assert_eq!(divisions_to_ticks(2, 4, 480), 240);
        assert_eq!(divisions_to_ticks(3, 2, 480), 720);
        assert_eq!(divisions_to_ticks(5, 0, 480), 0);
    }

    #[test]
    fn test_header_and_meta_events() {
        let seq = sequence(&[(Some(60), 1), (Some(62), 1)], 1);
        let bytes = encode_sequence(&seq, TimeSignature::new(3, 4).unwrap(), &MidiExportOptions::default()).unwrap();

        // 14-byte header: MThd, length 6, format 0, one track, 480 PPQ
        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 6]);
        assert_eq!(&bytes[8..10], &[0, 0]);
        assert_eq!(&bytes[10..12], &[0, 1]);
        assert_eq!(&bytes[12..14], &[0x01, 0xE0]);
        assert_eq!(&bytes[14..18], b"MTrk");

        let summary = summarize(&bytes).unwrap();
        assert_eq!(summary.format, "single-track");
        assert_eq!(summary.tempo, Some(500_000));
        assert_eq!(summary.time_signature, Some((3, 4)));
        assert_eq!(summary.keys, [60, 62]);
        assert_eq!(summary.length_ticks, 960);
    }

    #[test]
    fn test_rests_advance_time() {
        let seq = sequence(&[(Some(60), 4), (None, 4), (Some(64), 4)], 4);
        let bytes = encode_sequence(&seq, TimeSignature::default(), &MidiExportOptions::default()).unwrap();

        let smf = Smf::parse(&bytes).unwrap();
        let mut tick = 0;
        let mut on_ticks = Vec::new();
        for event in &smf.tracks[0] {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { .. },
                ..
            } = event.kind
            {
                on_ticks.push(tick);
            }
        }
        assert_eq!(on_ticks, [0, 960]);
        assert_eq!(summarize(&bytes).unwrap().length_ticks, 1440);
    }

    #[test]
    fn test_note_off_precedes_next_note_on() {
        let seq = sequence(&[(Some(60), 1), (Some(60), 1)], 1);
        let bytes = encode_sequence(&seq, TimeSignature::default(), &MidiExportOptions::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        let notes: Vec<_> = smf.tracks[0]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi { message, .. } => Some((e.delta.as_int(), message)),
                _ => None,
            })
            .collect();
        assert!(matches!(notes[0].1, MidiMessage::NoteOn { .. }));
        assert!(matches!(notes[1], (480, MidiMessage::NoteOff { .. })));
        assert!(matches!(notes[2], (0, MidiMessage::NoteOn { .. })));
    }

    #[test]
    fn test_encode_score_uses_instrument_program() {
        let mut score = Score::new("Scale", "trumpet", Key::default(), TimeSignature::default(), 90);
        let mut m = Measure::new(1);
        m.notes.push(ScoreNote::note(Pitch::new(Step::C, 0, 4), 16));
        score.measures.push(m);

        let bytes = encode_score(&score, &MidiExportOptions::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        let program = smf.tracks[0].iter().find_map(|e| match e.kind {
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            } => Some(program.as_int()),
            _ => None,
        });
        assert_eq!(program, Some(56));

        let name = smf.tracks[0].iter().find_map(|e| match e.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(n)) => Some(n.to_vec()),
            _ => None,
        });
        assert_eq!(name.as_deref(), Some(&b"Scale"[..]));

        // 90 BPM
        assert_eq!(summarize(&bytes).unwrap().tempo, Some(666_667));
    }

    #[test]
    fn test_export_options() {
        let seq = sequence(&[(Some(60), 1)], 1);
        let options = MidiExportOptions {
            ppq: 960,
            include_tempo: false,
            include_time_signature: false,
            ..Default::default()
        };
        let bytes = encode_sequence(&seq, TimeSignature::default(), &options).unwrap();
        let summary = summarize(&bytes).unwrap();
        assert_eq!(summary.ppq, 960);
        assert_eq!(summary.tempo, None);
        assert_eq!(summary.time_signature, None);
    }

    #[test]
    fn test_invalid_options() {
        let seq = sequence(&[(Some(60), 1)], 1);
        let bad_ppq = MidiExportOptions {
            ppq: 0,
            ..Default::default()
        };
        assert!(matches!(
            encode_sequence(&seq, TimeSignature::default(), &bad_ppq),
            Err(MidiError::InvalidPpq(0))
        ));

        let zero = sequence(&[(Some(60), 1)], 0);
        assert!(matches!(
            encode_sequence(&zero, TimeSignature::default(), &MidiExportOptions::default()),
            Err(MidiError::ZeroDivisions)
        ));
    }

    #[test]
    fn test_tempo_calculation() {
        assert_eq!(tempo_micros(120.0), 500_000);
        assert_eq!(tempo_micros(60.0), 1_000_000);
    }
}
