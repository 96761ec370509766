// Keys, scales and intervals
// Key signatures follow the circle of fifths; scales are spelled diatonically from the tonic

use serde::{Deserialize, Serialize};
use std::fmt;

use super::pitch::{Pitch, Step};
use super::TheoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

/// A tonal center, e.g. F# major or Bb minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub tonic: Step,
    pub alter: i8,
    pub mode: Mode,
}

impl Default for Key {
    fn default() -> Self {
        Key {
            tonic: Step::C,
            alter: 0,
            mode: Mode::Major,
        }
    }
}

impl Key {
    /// Parse "C", "F#", "Bb", "Am", "F#m", "C major", "A minor"
    pub fn parse(name: &str) -> Result<Key, TheoryError> {
        let invalid = || TheoryError::InvalidKey(name.to_string());
        let trimmed = name.trim();
        let mut chars = trimmed.chars();
        let tonic = chars.next().and_then(Step::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();

        let (alter, suffix) = if let Some(r) = rest.strip_prefix('#') {
            (1, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (-1, r)
        } else {
            (0, rest)
        };

        let mode = match suffix.trim().to_lowercase().as_str() {
            "" | "maj" | "major" => Mode::Major,
            "m" | "min" | "minor" => Mode::Minor,
            _ => return Err(invalid()),
        };

        let key = Key { tonic, alter, mode };
        if key.fifths().abs() > 7 {
            return Err(invalid());
        }
        Ok(key)
    }

    /// Number of sharps (positive) or flats (negative) in the key signature
    pub fn fifths(&self) -> i32 {
        let tonic = self.tonic.fifths() + 7 * self.alter as i32;
        match self.mode {
            Mode::Major => tonic,
            Mode::Minor => tonic - 3,
        }
    }

    /// Whether chromatic notes should be spelled with flats
    pub fn prefer_flats(&self) -> bool {
        self.fifths() < 0
    }

    /// Tonic pitch in the given octave
    pub fn tonic_pitch(&self, octave: i8) -> Pitch {
        Pitch::new(self.tonic, self.alter, octave)
    }

    /// The scale native to this key's mode
    pub fn native_scale(&self) -> ScaleKind {
        match self.mode {
            Mode::Major => ScaleKind::Major,
            Mode::Minor => ScaleKind::NaturalMinor,
        }
    }

    /// Build a scale of the given kind on this key's tonic
    pub fn scale(&self, kind: ScaleKind, octave: i8) -> Scale {
        let tonic = self.tonic_pitch(octave);

        if kind == ScaleKind::Chromatic {
            let base = tonic.midi_number();
            let pitches = (0..12)
                .map(|i| {
                    let n = (base + i).clamp(0, 127) as u8;
                    let spelled = Pitch::from_midi(n, self.prefer_flats());
                    // Keep the tonic's own spelling for degree 0
                    if i == 0 {
                        tonic
                    } else {
                        spelled
                    }
                })
                .collect();
            return Scale { pitches };
        }

        let pitches = kind
            .degrees()
            .iter()
            .map(|&(letter_offset, semitones)| tonic.spelled_above(letter_offset, semitones))
            .collect();

        Scale { pitches }
    }

    /// Short display name ("F#", "Bbm")
    pub fn name(&self) -> String {
        let accidental = match self.alter {
            1 => "#",
            -1 => "b",
            _ => "",
        };
        let mode = match self.mode {
            Mode::Major => "",
            Mode::Minor => "m",
        };
        format!("{}{}{}", self.tonic.as_str(), accidental, mode)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Major,
    NaturalMinor,
    HarmonicMinor,
    MajorPentatonic,
    MinorPentatonic,
    Chromatic,
}

impl ScaleKind {
    /// (letter offset from tonic, semitones from tonic) per degree
    fn degrees(&self) -> &'static [(usize, i32)] {
        match self {
            ScaleKind::Major => &[(0, 0), (1, 2), (2, 4), (3, 5), (4, 7), (5, 9), (6, 11)],
            ScaleKind::NaturalMinor => &[(0, 0), (1, 2), (2, 3), (3, 5), (4, 7), (5, 8), (6, 10)],
            ScaleKind::HarmonicMinor => &[(0, 0), (1, 2), (2, 3), (3, 5), (4, 7), (5, 8), (6, 11)],
            ScaleKind::MajorPentatonic => &[(0, 0), (1, 2), (2, 4), (4, 7), (5, 9)],
            ScaleKind::MinorPentatonic => &[(0, 0), (2, 3), (3, 5), (4, 7), (6, 10)],
            ScaleKind::Chromatic => &[],
        }
    }
}

/// One octave of spelled scale pitches, extendable by degree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pub pitches: Vec<Pitch>,
}

impl Scale {
    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    /// Scale degree with octave wrap-around (degree 7 of a major scale is the upper tonic)
    pub fn degree(&self, degree: i32) -> Pitch {
        let len = self.pitches.len() as i32;
        let octave_shift = degree.div_euclid(len) as i8;
        self.pitches[degree.rem_euclid(len) as usize].shift_octaves(octave_shift)
    }
}

/// Interval sizes used by interval drills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Seconds,
    Thirds,
    Fourths,
    Fifths,
    Sixths,
    Octaves,
}

impl Interval {
    pub fn parse(name: &str) -> Option<Interval> {
        match name.trim().to_lowercase().as_str() {
            "seconds" | "second" | "2nds" => Some(Interval::Seconds),
            "thirds" | "third" | "3rds" => Some(Interval::Thirds),
            "fourths" | "fourth" | "4ths" => Some(Interval::Fourths),
            "fifths" | "fifth" | "5ths" => Some(Interval::Fifths),
            "sixths" | "sixth" | "6ths" => Some(Interval::Sixths),
            "octaves" | "octave" => Some(Interval::Octaves),
            _ => None,
        }
    }

    /// Major/perfect size in semitones
    pub fn semitones(&self) -> i32 {
        match self {
            Interval::Seconds => 2,
            Interval::Thirds => 4,
            Interval::Fourths => 5,
            Interval::Fifths => 7,
            Interval::Sixths => 9,
            Interval::Octaves => 12,
        }
    }

    /// Distance in scale steps, for diatonic interval drills
    pub fn scale_steps(&self) -> i32 {
        match self {
            Interval::Seconds => 1,
            Interval::Thirds => 2,
            Interval::Fourths => 3,
            Interval::Fifths => 4,
            Interval::Sixths => 5,
            Interval::Octaves => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Seconds => "seconds",
            Interval::Thirds => "thirds",
            Interval::Fourths => "fourths",
            Interval::Fifths => "fifths",
            Interval::Sixths => "sixths",
            Interval::Octaves => "octaves",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(scale: &Scale) -> Vec<String> {
        scale.pitches.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_key_signature_fifths() {
        let cases = [
            ("C", 0),
            ("G", 1),
            ("F#", 6),
            ("F", -1),
            ("Gb", -6),
            ("Am", 0),
            ("Em", 1),
            ("D#m", 6),
            ("Ebm", -6),
            ("Dm", -1),
            ("C minor", -3),
        ];
        for (name, fifths) in cases {
            assert_eq!(Key::parse(name).unwrap().fifths(), fifths, "key {}", name);
        }
    }

    #[test]
    fn test_key_parse_rejects_unknown() {
        assert!(Key::parse("H").is_err());
        assert!(Key::parse("C dorian").is_err());
        // G# major would need eight sharps
        assert!(Key::parse("G#").is_err());
    }

    #[test]
    fn test_key_name_round_trip() {
        assert_eq!(Key::parse("Bb minor").unwrap().name(), "Bbm");
        assert_eq!(Key::parse("f#").unwrap().name(), "F#");
    }

    #[test]
    fn test_major_scale_spelling() {
        let d = Key::parse("D").unwrap().scale(ScaleKind::Major, 4);
        assert_eq!(names(&d), ["D4", "E4", "F#4", "G4", "A4", "B4", "C#5"]);

        let f = Key::parse("F").unwrap().scale(ScaleKind::Major, 4);
        assert_eq!(names(&f), ["F4", "G4", "A4", "Bb4", "C5", "D5", "E5"]);
    }

    #[test]
    fn test_minor_scales() {
        let a = Key::parse("Am").unwrap();
        let natural = a.scale(ScaleKind::NaturalMinor, 4);
        assert_eq!(names(&natural), ["A4", "B4", "C5", "D5", "E5", "F5", "G5"]);

        let harmonic = a.scale(ScaleKind::HarmonicMinor, 4);
        assert_eq!(harmonic.pitches[6].to_string(), "G#5");
    }

    #[test]
    fn test_scale_degree_wraps_octaves() {
        let c = Key::default().scale(ScaleKind::Major, 4);
        assert_eq!(c.degree(7).to_string(), "C5");
        assert_eq!(c.degree(-1).to_string(), "B3");
        assert_eq!(c.degree(9).to_string(), "E5");
    }

    #[test]
    fn test_chromatic_scale_uses_key_spelling() {
        let f = Key::parse("F").unwrap().scale(ScaleKind::Chromatic, 4);
        assert_eq!(f.len(), 12);
        assert_eq!(f.pitches[1].to_string(), "Gb4");

        let g = Key::parse("G").unwrap().scale(ScaleKind::Chromatic, 4);
        assert_eq!(g.pitches[1].to_string(), "G#4");
    }

    #[test]
    fn test_interval_sizes() {
        assert_eq!(Interval::parse("thirds").unwrap().semitones(), 4);
        assert_eq!(Interval::parse("Fifths").unwrap().scale_steps(), 4);
        assert!(Interval::parse("ninths").is_none());
    }
}
