// Procedural exercise generator
// Seeded rhythm and pitch choices driven by level, focus and instrument range

use super::metadata::exercise_title;
use super::params::{ArpeggioKind, ExerciseSpec, Focus, Level, RhythmStyle};
use super::score::{Measure, Score, ScoreNote, DIVISIONS};
use crate::midi::instruments;
use crate::theory::{NoteValue, Pitch, Scale};

/// Chance that a note slot becomes a rest
pub const REST_PROBABILITY: f64 = 0.2;

/// Seeded pseudorandom stream for generation
pub struct Rng(oorandom::Rand64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng(oorandom::Rand64::new(seed as u128))
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.0.rand_float() < p
    }

    /// Uniform index below `n` (n > 0)
    pub fn below(&mut self, n: usize) -> usize {
        self.0.rand_range(0..n as u64) as usize
    }
}

/// Fresh seed for requests that did not pin one
pub fn random_seed() -> u64 {
    uuid::Uuid::new_v4().as_u128() as u64
}

/// Generate a complete score; the same spec and seed always give the same notes
pub fn generate_score(spec: &ExerciseSpec, seed: u64) -> Score {
    let mut rng = Rng::new(seed);
    let (lowest, highest) = instruments::playable_range(&spec.instrument);
    let octave = home_octave(spec, lowest, highest);

    let mut score = Score::new(
        &exercise_title(&spec.focus_type, &spec.key_name),
        &spec.instrument,
        spec.key,
        spec.time,
        spec.tempo_bpm,
    );

    // Rhythm first, then pitches for every slot
    let rhythm: Vec<Vec<u32>> = (0..spec.bars).map(|_| measure_rhythm(spec, &mut rng)).collect();
    let slot_count: usize = rhythm.iter().map(|m| m.len()).sum();
    let mut pitches = PitchWalker::new(spec, octave);

    let mut slot = 0;
    for (index, durations) in rhythm.iter().enumerate() {
        let mut measure = Measure::new(index as u32 + 1);
        for &duration in durations.iter() {
            let is_first = slot == 0;
            let is_last = slot + 1 == slot_count;
            let note = if is_last {
                ScoreNote::note(pitches.tonic(), duration)
            } else if !is_first && rng.chance(REST_PROBABILITY) {
                ScoreNote::rest(duration)
            } else {
                ScoreNote::note(pitches.next(&mut rng), duration)
            };
            measure.notes.push(fit_to_range(note, lowest, highest));
            slot += 1;
        }
        score.measures.push(measure);
    }

    log::debug!(
        "Generated {} bars ({} notes) for {} with seed {}",
        spec.bars,
        score.sounding_count(),
        spec.instrument,
        seed
    );
    score
}

/// Octave for the tonic, placing it in the lower third of the instrument's range
fn home_octave(spec: &ExerciseSpec, lowest: u8, highest: u8) -> i8 {
    let target = lowest as i32 + (highest as i32 - lowest as i32) / 4;
    let mut octave = (target / 12 - 1) as i8;
    let tonic = spec.key.tonic_pitch(octave);
    if tonic.midi_number() < lowest as i32 {
        octave += 1;
    }
    octave
}

/// Move a note by octaves until it sits inside the range
fn fit_to_range(note: ScoreNote, lowest: u8, highest: u8) -> ScoreNote {
    let Some(mut pitch) = note.pitch else {
        return note;
    };
    for _ in 0..10 {
        let n = pitch.midi_number();
        if n < lowest as i32 {
            pitch = pitch.shift_octaves(1);
        } else if n > highest as i32 {
            pitch = pitch.shift_octaves(-1);
        } else {
            break;
        }
    }
    ScoreNote::note(pitch, note.duration)
}

fn is_writable(duration: u32) -> bool {
    NoteValue::from_divisions(duration, DIVISIONS).is_some()
}

/// Durations for one measure, summing exactly to the measure length
fn measure_rhythm(spec: &ExerciseSpec, rng: &mut Rng) -> Vec<u32> {
    let beat = spec.time.beat_divisions(DIVISIONS);
    let beats = spec.time.numerator as u32;
    let half = beat / 2;
    let quarter = beat / 4;
    let can_halve = beat % 2 == 0 && is_writable(half);
    let can_quarter = beat % 4 == 0 && is_writable(quarter);

    let mut durations = Vec::new();
    let mut b = 0;
    while b < beats {
        let remaining = beats - b;

        // Compound meters group beats in threes as dotted values
        if spec.focus == Focus::Rhythm(RhythmStyle::Compound) && remaining >= 3 && is_writable(beat * 3) {
            if can_halve && rng.chance(0.5) {
                durations.extend([beat * 2, beat]);
            } else {
                durations.push(beat * 3);
            }
            b += 3;
            continue;
        }

        // Syncopation: short-long-short across two beats
        if spec.focus == Focus::Rhythm(RhythmStyle::Syncopated) && remaining >= 2 && can_halve && rng.chance(0.6) {
            durations.extend([half, beat, half]);
            b += 2;
            continue;
        }

        // Held notes over two beats
        if remaining >= 2 && is_writable(beat * 2) && rng.chance(0.25) {
            durations.push(beat * 2);
            b += 2;
            continue;
        }

        match spec.level {
            Level::Beginner => durations.push(beat),
            Level::Intermediate => {
                if can_halve && rng.chance(0.35) {
                    durations.extend([half, half]);
                } else {
                    durations.push(beat);
                }
            }
            Level::Advanced => {
                let roll = rng.below(4);
                if roll == 0 && can_quarter {
                    durations.extend([quarter; 4]);
                } else if roll == 1 && can_halve && can_quarter {
                    durations.extend([half, quarter, quarter]);
                } else if roll == 2 && can_halve {
                    durations.extend([half, half]);
                } else {
                    durations.push(beat);
                }
            }
        }
        b += 1;
    }
    durations
}

/// Produces pitches for the focus of the exercise
struct PitchWalker {
    focus: Focus,
    scale: Scale,
    tonic: Pitch,
    position: i32,
    direction: i32,
    /// Pending upper note of an interval pair
    pending: Option<Pitch>,
}

impl PitchWalker {
    fn new(spec: &ExerciseSpec, octave: i8) -> Self {
        let kind = match spec.focus {
            Focus::Scales(kind) => kind,
            _ => spec.key.native_scale(),
        };
        PitchWalker {
            focus: spec.focus.clone(),
            scale: spec.key.scale(kind, octave),
            tonic: spec.key.tonic_pitch(octave),
            position: 0,
            direction: 1,
            pending: None,
        }
    }

    fn tonic(&self) -> Pitch {
        self.tonic
    }

    fn next(&mut self, rng: &mut Rng) -> Pitch {
        match self.focus.clone() {
            Focus::Scales(_) => self.next_scale_step(),
            Focus::Intervals(interval) => {
                if let Some(upper) = self.pending.take() {
                    return upper;
                }
                let base = rng.below(self.scale.len()) as i32;
                self.pending = Some(self.scale.degree(base + interval.scale_steps()));
                self.scale.degree(base)
            }
            Focus::Arpeggios(kind) => self.next_arpeggio_tone(kind),
            Focus::Rhythm(_) => {
                if rng.chance(0.25) {
                    self.scale.degree(4)
                } else {
                    self.tonic
                }
            }
            Focus::Other(_) => {
                let degree = rng.below(self.scale.len() + 1) as i32;
                self.scale.degree(degree)
            }
        }
    }

    /// Up one octave of the scale and back down, repeating
    fn next_scale_step(&mut self) -> Pitch {
        let top = self.scale.len() as i32;
        let pitch = self.scale.degree(self.position);
        if self.position + self.direction > top || self.position + self.direction < 0 {
            self.direction = -self.direction;
        }
        self.position += self.direction;
        pitch
    }

    fn next_arpeggio_tone(&mut self, kind: ArpeggioKind) -> Pitch {
        // Chord tones are stacked thirds: letter offsets 0, 2, 4, 6
        let tones: Vec<Pitch> = kind
            .chord_tones()
            .iter()
            .enumerate()
            .map(|(i, &semis)| self.tonic.spelled_above(i * 2, semis))
            .chain(std::iter::once(self.tonic.shift_octaves(1)))
            .collect();

        let top = tones.len() as i32 - 1;
        let pitch = tones[self.position.clamp(0, top) as usize];
        if self.position + self.direction > top || self.position + self.direction < 0 {
            self.direction = -self.direction;
        }
        self.position += self.direction;
        pitch
    }
}
