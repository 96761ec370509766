// Pitch spelling and MIDI note numbers
// Letter-name pitches with accidentals, as MusicXML writes them

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TheoryError;

/// Natural note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub const ALL: [Step; 7] = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];

    /// Semitones above C
    pub fn semitone(&self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Position in the C-based letter sequence (C = 0 .. B = 6)
    pub fn index(&self) -> usize {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    pub fn from_index(index: usize) -> Step {
        Step::ALL[index % 7]
    }

    /// Position on the circle of fifths relative to C (F = -1, B = 5)
    pub fn fifths(&self) -> i32 {
        match self {
            Step::F => -1,
            Step::C => 0,
            Step::G => 1,
            Step::D => 2,
            Step::A => 3,
            Step::E => 4,
            Step::B => 5,
        }
    }

    pub fn from_char(c: char) -> Option<Step> {
        match c.to_ascii_uppercase() {
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            _ => None,
        }
    }

    /// Accepts a bare letter name ("C") in either case
    pub fn from_name(name: &str) -> Option<Step> {
        let mut chars = name.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Step::from_char(c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::C => "C",
            Step::D => "D",
            Step::E => "E",
            Step::F => "F",
            Step::G => "G",
            Step::A => "A",
            Step::B => "B",
        }
    }
}

/// A spelled pitch: letter, chromatic alteration and octave (C4 = middle C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    pub alter: i8,
    pub octave: i8,
}

const SHARP_SPELLINGS: [(Step, i8); 12] = [
    (Step::C, 0),
    (Step::C, 1),
    (Step::D, 0),
    (Step::D, 1),
    (Step::E, 0),
    (Step::F, 0),
    (Step::F, 1),
    (Step::G, 0),
    (Step::G, 1),
    (Step::A, 0),
    (Step::A, 1),
    (Step::B, 0),
];

const FLAT_SPELLINGS: [(Step, i8); 12] = [
    (Step::C, 0),
    (Step::D, -1),
    (Step::D, 0),
    (Step::E, -1),
    (Step::E, 0),
    (Step::F, 0),
    (Step::G, -1),
    (Step::G, 0),
    (Step::A, -1),
    (Step::A, 0),
    (Step::B, -1),
    (Step::B, 0),
];

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Pitch { step, alter, octave }
    }

    /// MIDI note number, unchecked (C4 = 60)
    pub fn midi_number(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.step.semitone() + self.alter as i32
    }

    /// MIDI note number, failing outside 0..=127
    pub fn to_midi(&self) -> Result<u8, TheoryError> {
        let n = self.midi_number();
        if (0..=127).contains(&n) {
            Ok(n as u8)
        } else {
            Err(TheoryError::OutOfRange(n))
        }
    }

    /// Spell a MIDI note number with sharps or flats
    pub fn from_midi(note: u8, prefer_flats: bool) -> Pitch {
        let table = if prefer_flats { &FLAT_SPELLINGS } else { &SHARP_SPELLINGS };
        let (step, alter) = table[(note % 12) as usize];
        Pitch {
            step,
            alter,
            octave: (note / 12) as i8 - 1,
        }
    }

    /// Parse names like "C4", "D#3", "Bb5" or "C-1"
    pub fn parse(name: &str) -> Result<Pitch, TheoryError> {
        let invalid = || TheoryError::InvalidNote(name.to_string());
        let trimmed = name.trim();
        let mut chars = trimmed.chars();
        let step = chars.next().and_then(Step::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();

        let (alter, octave_str) = if let Some(r) = rest.strip_prefix('#') {
            (1, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (-1, r)
        } else {
            (0, rest)
        };

        let octave: i8 = octave_str.parse().map_err(|_| invalid())?;
        if !(-1..=9).contains(&octave) {
            return Err(invalid());
        }

        Ok(Pitch { step, alter, octave })
    }

    /// Move by a number of semitones, respelling the result
    pub fn transpose(&self, semitones: i32, prefer_flats: bool) -> Result<Pitch, TheoryError> {
        let n = self.midi_number() + semitones;
        if !(0..=127).contains(&n) {
            return Err(TheoryError::OutOfRange(n));
        }
        Ok(Pitch::from_midi(n as u8, prefer_flats))
    }

    /// The pitch `letter_steps` letter names and `semitones` semitones above this one,
    /// spelled diatonically (a minor third above C is Eb, never D#)
    pub fn spelled_above(&self, letter_steps: usize, semitones: i32) -> Pitch {
        let letter_index = self.step.index() + letter_steps;
        let step = Step::from_index(letter_index);
        let octave = self.octave + (letter_index / 7) as i8;
        let natural = Pitch::new(step, 0, octave).midi_number();
        Pitch::new(step, (self.midi_number() + semitones - natural) as i8, octave)
    }

    /// Same spelling, shifted by whole octaves
    pub fn shift_octaves(&self, octaves: i8) -> Pitch {
        Pitch {
            octave: self.octave + octaves,
            ..*self
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.alter {
            2 => "##",
            1 => "#",
            -1 => "b",
            -2 => "bb",
            _ => "",
        };
        write!(f, "{}{}{}", self.step.as_str(), accidental, self.octave)
    }
}
