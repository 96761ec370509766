// Meter and note values
// Time signatures and the written note lengths used in MusicXML <type> elements

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TheoryError;

/// Musical time signature, e.g. 3/4 or 6/8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    /// Validated constructor: numerator 1..=16, denominator a power of two up to 16
    pub fn new(numerator: u8, denominator: u8) -> Result<Self, TheoryError> {
        let valid_denominator = matches!(denominator, 1 | 2 | 4 | 8 | 16);
        if !(1..=16).contains(&numerator) || !valid_denominator {
            return Err(TheoryError::InvalidTimeSignature(format!(
                "{}/{}",
                numerator, denominator
            )));
        }
        Ok(TimeSignature {
            numerator,
            denominator,
        })
    }

    /// Parse "3/4"
    pub fn parse(text: &str) -> Result<Self, TheoryError> {
        let invalid = || TheoryError::InvalidTimeSignature(text.to_string());
        let (num, den) = text.trim().split_once('/').ok_or_else(invalid)?;
        let numerator = num.trim().parse().map_err(|_| invalid())?;
        let denominator = den.trim().parse().map_err(|_| invalid())?;
        TimeSignature::new(numerator, denominator).map_err(|_| invalid())
    }

    /// Length of one beat in divisions, given divisions per quarter note
    pub fn beat_divisions(&self, divisions_per_quarter: u32) -> u32 {
        (divisions_per_quarter * 4 / self.denominator as u32).max(1)
    }

    /// Length of one full measure in divisions
    pub fn measure_divisions(&self, divisions_per_quarter: u32) -> u32 {
        self.numerator as u32 * self.beat_divisions(divisions_per_quarter)
    }

    /// Denominator as a power of two, as stored in the MIDI time signature meta event
    pub fn denominator_power(&self) -> u8 {
        self.denominator.trailing_zeros() as u8
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Written note lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteValue {
    pub const ALL: [NoteValue; 5] = [
        NoteValue::Whole,
        NoteValue::Half,
        NoteValue::Quarter,
        NoteValue::Eighth,
        NoteValue::Sixteenth,
    ];

    /// How many of this value fit in a whole note
    fn per_whole(&self) -> u32 {
        match self {
            NoteValue::Whole => 1,
            NoteValue::Half => 2,
            NoteValue::Quarter => 4,
            NoteValue::Eighth => 8,
            NoteValue::Sixteenth => 16,
        }
    }

    /// Length in divisions; zero when the resolution is too coarse
    pub fn divisions(&self, divisions_per_quarter: u32) -> u32 {
        divisions_per_quarter * 4 / self.per_whole()
    }

    /// MusicXML <type> text
    pub fn type_name(&self) -> &'static str {
        match self {
            NoteValue::Whole => "whole",
            NoteValue::Half => "half",
            NoteValue::Quarter => "quarter",
            NoteValue::Eighth => "eighth",
            NoteValue::Sixteenth => "16th",
        }
    }

    /// Parse the short duration symbols used in note text ("q", "e", "8", "half")
    pub fn from_symbol(symbol: &str) -> Option<NoteValue> {
        match symbol.trim().to_lowercase().as_str() {
            "w" | "1" | "whole" => Some(NoteValue::Whole),
            "h" | "2" | "half" => Some(NoteValue::Half),
            "q" | "4" | "quarter" => Some(NoteValue::Quarter),
            "e" | "8" | "eighth" => Some(NoteValue::Eighth),
            "s" | "16" | "16th" | "sixteenth" => Some(NoteValue::Sixteenth),
            _ => None,
        }
    }

    /// Find the written value (and whether it is dotted) for a length in divisions
    pub fn from_divisions(duration: u32, divisions_per_quarter: u32) -> Option<(NoteValue, bool)> {
        NoteValue::ALL.iter().find_map(|value| {
            let plain = value.divisions(divisions_per_quarter);
            if plain == 0 {
                None
            } else if plain == duration {
                Some((*value, false))
            } else if plain % 2 == 0 && plain + plain / 2 == duration {
                Some((*value, true))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_signature_validation() {
        assert!(TimeSignature::new(4, 4).is_ok());
        assert!(TimeSignature::new(7, 8).is_ok());
        assert!(TimeSignature::new(0, 4).is_err());
        assert!(TimeSignature::new(4, 3).is_err());
        assert!(TimeSignature::new(17, 4).is_err());
    }

    #[test]
    fn test_parse_time_signature() {
        let ts = TimeSignature::parse(" 6/8 ").unwrap();
        assert_eq!(ts, TimeSignature::new(6, 8).unwrap());
        assert_eq!(ts.to_string(), "6/8");
        assert!(TimeSignature::parse("6-8").is_err());
    }

    #[test]
    fn test_measure_divisions() {
        assert_eq!(TimeSignature::new(4, 4).unwrap().measure_divisions(4), 16);
        assert_eq!(TimeSignature::new(3, 4).unwrap().measure_divisions(1), 3);
        assert_eq!(TimeSignature::new(6, 8).unwrap().measure_divisions(4), 12);
        assert_eq!(TimeSignature::new(2, 2).unwrap().beat_divisions(4), 8);
    }

    #[test]
    fn test_denominator_power() {
        assert_eq!(TimeSignature::new(4, 4).unwrap().denominator_power(), 2);
        assert_eq!(TimeSignature::new(6, 8).unwrap().denominator_power(), 3);
        assert_eq!(TimeSignature::new(2, 1).unwrap().denominator_power(), 0);
    }

    #[test]
    fn test_note_value_divisions() {
        assert_eq!(NoteValue::Quarter.divisions(4), 4);
        assert_eq!(NoteValue::Sixteenth.divisions(4), 1);
        assert_eq!(NoteValue::Eighth.divisions(1), 0);
    }

    #[test]
    fn test_from_divisions_handles_dots() {
        assert_eq!(NoteValue::from_divisions(4, 4), Some((NoteValue::Quarter, false)));
        assert_eq!(NoteValue::from_divisions(6, 4), Some((NoteValue::Quarter, true)));
        assert_eq!(NoteValue::from_divisions(12, 4), Some((NoteValue::Half, true)));
        assert_eq!(NoteValue::from_divisions(5, 4), None);
    }
}
