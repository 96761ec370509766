// Exercise parameters - Form input and its validated form
// Form fields arrive as strings (or numbers); blanks fall back to defaults, anything else is validated

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::midi::instruments;
use crate::theory::{Interval, Key, ScaleKind, TimeSignature};

pub const DEFAULT_INSTRUMENT: &str = "piano";
pub const DEFAULT_LEVEL: &str = "beginner";
pub const DEFAULT_KEY: &str = "C";
pub const DEFAULT_METER: &str = "4";
pub const DEFAULT_FOCUS_TYPE: &str = "scales";
pub const DEFAULT_FOCUS_VALUE: &str = "major";
pub const DEFAULT_BARS: u32 = 16;
pub const DEFAULT_TEMPO_BPM: u16 = 120;

pub const MAX_BARS: u32 = 64;
pub const TEMPO_RANGE: std::ops::RangeInclusive<u16> = 30..=300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("Invalid level: {0} (expected beginner, intermediate or advanced)")]
    InvalidLevel(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid time signature: {0}")]
    InvalidTimeSignature(String),
    #[error("Invalid focus value '{value}' for {kind}")]
    InvalidFocus { kind: String, value: String },
    #[error("Invalid bar count: {0} (expected 1-64)")]
    InvalidBars(String),
    #[error("Invalid tempo: {0} (expected 30-300 BPM)")]
    InvalidTempo(String),
}

/// Raw exercise parameters as submitted by the exercise form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "form_value", skip_serializing_if = "Option::is_none")]
    pub meter_numerator: Option<String>,
    #[serde(default, deserialize_with = "form_value", skip_serializing_if = "Option::is_none")]
    pub meter_denominator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_value: Option<String>,
    #[serde(default, deserialize_with = "form_value", skip_serializing_if = "Option::is_none")]
    pub bars: Option<String>,
    #[serde(default, deserialize_with = "form_value", skip_serializing_if = "Option::is_none")]
    pub tempo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FormValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Accept "16" or 16 for numeric form fields
fn form_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<FormValue> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        FormValue::Text(s) => s,
        FormValue::Integer(n) => n.to_string(),
        FormValue::Float(f) => f.to_string(),
    }))
}

/// Value of a form field, treating blank strings as absent
fn field<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => default,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn parse(name: &str) -> Option<Level> {
        match name.trim().to_lowercase().as_str() {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "advanced" => Some(Level::Advanced),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArpeggioKind {
    Major,
    Minor,
    Dominant7,
}

impl ArpeggioKind {
    /// Chord tones in semitones above the root
    pub fn chord_tones(&self) -> &'static [i32] {
        match self {
            ArpeggioKind::Major => &[0, 4, 7],
            ArpeggioKind::Minor => &[0, 3, 7],
            ArpeggioKind::Dominant7 => &[0, 4, 7, 10],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmStyle {
    Simple,
    Compound,
    Syncopated,
}

/// What the exercise drills
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Focus {
    Scales(ScaleKind),
    Intervals(Interval),
    Arpeggios(ArpeggioKind),
    Rhythm(RhythmStyle),
    /// Unrecognised focus types get random scale tones
    Other(String),
}

impl Focus {
    pub fn parse(kind: &str, value: &str) -> Result<Focus, ParamError> {
        let invalid = || ParamError::InvalidFocus {
            kind: kind.to_string(),
            value: value.to_string(),
        };
        let value_lc = value.trim().to_lowercase();

        match kind.trim().to_lowercase().as_str() {
            "scales" | "scale" => {
                let scale = match value_lc.as_str() {
                    "major" => ScaleKind::Major,
                    "minor" | "natural_minor" => ScaleKind::NaturalMinor,
                    "harmonic_minor" | "harmonic minor" => ScaleKind::HarmonicMinor,
                    "chromatic" => ScaleKind::Chromatic,
                    "pentatonic" | "major_pentatonic" => ScaleKind::MajorPentatonic,
                    "minor_pentatonic" => ScaleKind::MinorPentatonic,
                    _ => return Err(invalid()),
                };
                Ok(Focus::Scales(scale))
            }
            "intervals" | "interval" => Interval::parse(&value_lc)
                .map(Focus::Intervals)
                .ok_or_else(invalid),
            "arpeggios" | "arpeggio" => {
                let kind = match value_lc.as_str() {
                    "major" => ArpeggioKind::Major,
                    "minor" => ArpeggioKind::Minor,
                    "dominant7" | "dominant 7th" | "dom7" => ArpeggioKind::Dominant7,
                    _ => return Err(invalid()),
                };
                Ok(Focus::Arpeggios(kind))
            }
            "rhythm" => {
                let style = match value_lc.as_str() {
                    "simple" => RhythmStyle::Simple,
                    "compound" => RhythmStyle::Compound,
                    "syncopated" => RhythmStyle::Syncopated,
                    _ => return Err(invalid()),
                };
                Ok(Focus::Rhythm(style))
            }
            other => Ok(Focus::Other(other.to_string())),
        }
    }
}

/// Validated exercise request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSpec {
    /// Instrument table key
    pub instrument: String,
    pub level: Level,
    pub key: Key,
    /// Key exactly as requested, for titles and metadata
    pub key_name: String,
    pub time: TimeSignature,
    pub focus: Focus,
    pub focus_type: String,
    pub focus_value: String,
    pub bars: u32,
    pub tempo_bpm: u16,
    pub seed: Option<u64>,
}

impl ExerciseParameters {
    /// Validate with the stock 120 BPM default tempo
    pub fn parse(&self) -> Result<ExerciseSpec, ParamError> {
        self.parse_with_tempo(DEFAULT_TEMPO_BPM)
    }

    /// Validate, using `default_tempo` when no tempo was given
    pub fn parse_with_tempo(&self, default_tempo: u16) -> Result<ExerciseSpec, ParamError> {
        let instrument_name = field(&self.instrument, DEFAULT_INSTRUMENT);
        let instrument = instruments::normalize_name(instrument_name);
        if !instruments::is_known(&instrument) {
            return Err(ParamError::UnknownInstrument(instrument_name.to_string()));
        }

        let level_name = field(&self.level, DEFAULT_LEVEL);
        let level = Level::parse(level_name).ok_or_else(|| ParamError::InvalidLevel(level_name.to_string()))?;

        let key_name = field(&self.key, DEFAULT_KEY);
        let key = Key::parse(key_name).map_err(|_| ParamError::InvalidKey(key_name.to_string()))?;

        let time_text = format!(
            "{}/{}",
            field(&self.meter_numerator, DEFAULT_METER),
            field(&self.meter_denominator, DEFAULT_METER)
        );
        let time = TimeSignature::parse(&time_text).map_err(|_| ParamError::InvalidTimeSignature(time_text.clone()))?;

        let focus_type = field(&self.focus_type, DEFAULT_FOCUS_TYPE);
        let focus_value = field(&self.focus_value, DEFAULT_FOCUS_VALUE);
        let focus = Focus::parse(focus_type, focus_value)?;

        let bars = match self.bars.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text
                .parse::<u32>()
                .ok()
                .filter(|b| (1..=MAX_BARS).contains(b))
                .ok_or_else(|| ParamError::InvalidBars(text.to_string()))?,
            _ => DEFAULT_BARS,
        };

        let tempo_bpm = match self.tempo.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text
                .parse::<f64>()
                .ok()
                .map(|t| t.round())
                .filter(|t| *t >= *TEMPO_RANGE.start() as f64 && *t <= *TEMPO_RANGE.end() as f64)
                .map(|t| t as u16)
                .ok_or_else(|| ParamError::InvalidTempo(text.to_string()))?,
            _ => default_tempo,
        };

        Ok(ExerciseSpec {
            instrument,
            level,
            key,
            key_name: key_name.to_string(),
            time,
            focus,
            focus_type: focus_type.to_string(),
            focus_value: focus_value.to_string(),
            bars,
            tempo_bpm,
            seed: self.seed,
        })
    }
}

impl ExerciseSpec {
    /// The canonical parameters these were built from
    pub fn to_parameters(&self) -> ExerciseParameters {
        ExerciseParameters {
            instrument: Some(self.instrument.clone()),
            level: Some(self.level.as_str().to_string()),
            key: Some(self.key_name.clone()),
            meter_numerator: Some(self.time.numerator.to_string()),
            meter_denominator: Some(self.time.denominator.to_string()),
            focus_type: Some(self.focus_type.clone()),
            focus_value: Some(self.focus_value.clone()),
            bars: Some(self.bars.to_string()),
            tempo: Some(self.tempo_bpm.to_string()),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::Mode;

    #[test]
    fn test_missing_fields_take_defaults() {
        let spec = ExerciseParameters::default().parse().unwrap();
        assert_eq!(spec.instrument, "piano");
        assert_eq!(spec.level, Level::Beginner);
        assert_eq!(spec.key, Key::default());
        assert_eq!(spec.time, TimeSignature::default());
        assert_eq!(spec.focus, Focus::Scales(ScaleKind::Major));
        assert_eq!(spec.bars, 16);
        assert_eq!(spec.tempo_bpm, 120);
    }

    #[test]
    fn test_blank_fields_take_defaults() {
        let params = ExerciseParameters {
            key: Some("  ".to_string()),
            bars: Some(String::new()),
            ..Default::default()
        };
        let spec = params.parse().unwrap();
        assert_eq!(spec.key_name, "C");
        assert_eq!(spec.bars, 16);
    }

    #[test]
    fn test_form_json_with_strings_and_numbers() {
        let json = r#"{
            "instrument": "trumpet",
            "level": "intermediate",
            "key": "Bb",
            "meterNumerator": "3",
            "meterDenominator": 4,
            "focusType": "intervals",
            "focusValue": "thirds",
            "bars": 8,
            "seed": 42
        }"#;
        let params: ExerciseParameters = serde_json::from_str(json).unwrap();
        let spec = params.parse().unwrap();
        assert_eq!(spec.instrument, "trumpet");
        assert_eq!(spec.level, Level::Intermediate);
        assert_eq!(spec.key.fifths(), -2);
        assert_eq!(spec.time.to_string(), "3/4");
        assert_eq!(spec.focus, Focus::Intervals(Interval::Thirds));
        assert_eq!(spec.bars, 8);
        assert_eq!(spec.seed, Some(42));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_key = ExerciseParameters {
            key: Some("H".to_string()),
            ..Default::default()
        };
        assert_eq!(bad_key.parse(), Err(ParamError::InvalidKey("H".to_string())));

        let bad_bars = ExerciseParameters {
            bars: Some("0".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_bars.parse(), Err(ParamError::InvalidBars(_))));

        let too_many = ExerciseParameters {
            bars: Some("65".to_string()),
            ..Default::default()
        };
        assert!(matches!(too_many.parse(), Err(ParamError::InvalidBars(_))));

        let bad_meter = ExerciseParameters {
            meter_denominator: Some("3".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_meter.parse(), Err(ParamError::InvalidTimeSignature(_))));

        let bad_tempo = ExerciseParameters {
            tempo: Some("500".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_tempo.parse(), Err(ParamError::InvalidTempo(_))));

        let bad_instrument = ExerciseParameters {
            instrument: Some("kazoo".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_instrument.parse(), Err(ParamError::UnknownInstrument(_))));
    }

    #[test]
    fn test_focus_parsing() {
        assert_eq!(
            Focus::parse("arpeggios", "dominant7").unwrap(),
            Focus::Arpeggios(ArpeggioKind::Dominant7)
        );
        assert_eq!(
            Focus::parse("rhythm", "syncopated").unwrap(),
            Focus::Rhythm(RhythmStyle::Syncopated)
        );
        assert_eq!(Focus::parse("sight-reading", "any").unwrap(), Focus::Other("sight-reading".to_string()));
        assert!(Focus::parse("intervals", "ninths").is_err());
    }

    #[test]
    fn test_minor_key_and_default_tempo_override() {
        let params = ExerciseParameters {
            key: Some("F#m".to_string()),
            ..Default::default()
        };
        let spec = params.parse_with_tempo(90).unwrap();
        assert_eq!(spec.key.mode, Mode::Minor);
        assert_eq!(spec.tempo_bpm, 90);
    }

    #[test]
    fn test_to_parameters_round_trip() {
        let params = ExerciseParameters {
            instrument: Some("Alto Sax".to_string()),
            seed: Some(7),
            ..Default::default()
        };
        let spec = params.parse().unwrap();
        let again = spec.to_parameters().parse().unwrap();
        assert_eq!(again, spec);
        assert_eq!(again.instrument, "alto_sax");
    }
}
