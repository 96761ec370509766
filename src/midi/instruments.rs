// Instrument lookup tables
// General MIDI program numbers, display names, clefs and practical ranges

use serde::{Deserialize, Serialize};

/// General MIDI programs (0-79) keyed by instrument name
pub const INSTRUMENT_PROGRAMS: &[(&str, u8)] = &[
    ("piano", 0),
    ("acoustic_piano", 0),
    ("bright_piano", 1),
    ("electric_grand", 2),
    ("honky_tonk_piano", 3),
    ("electric_piano", 4),
    ("electric_piano_2", 5),
    ("harpsichord", 6),
    ("clavinet", 7),
    // Chromatic percussion
    ("celesta", 8),
    ("glockenspiel", 9),
    ("music_box", 10),
    ("vibraphone", 11),
    ("marimba", 12),
    ("xylophone", 13),
    ("tubular_bells", 14),
    ("dulcimer", 15),
    // Organ
    ("hammond_organ", 16),
    ("percussive_organ", 17),
    ("rock_organ", 18),
    ("church_organ", 19),
    ("reed_organ", 20),
    ("accordion", 21),
    ("harmonica", 22),
    ("tango_accordion", 23),
    // Guitar
    ("acoustic_guitar_nylon", 24),
    ("acoustic_guitar_steel", 25),
    ("electric_guitar_jazz", 26),
    ("electric_guitar_clean", 27),
    ("electric_guitar_muted", 28),
    ("overdriven_guitar", 29),
    ("distortion_guitar", 30),
    ("guitar_harmonics", 31),
    // Bass
    ("acoustic_bass", 32),
    ("electric_bass_finger", 33),
    ("electric_bass_pick", 34),
    ("fretless_bass", 35),
    ("slap_bass_1", 36),
    ("slap_bass_2", 37),
    ("synth_bass_1", 38),
    ("synth_bass_2", 39),
    // Strings
    ("violin", 40),
    ("viola", 41),
    ("cello", 42),
    ("contrabass", 43),
    ("tremolo_strings", 44),
    ("pizzicato_strings", 45),
    ("orchestral_harp", 46),
    ("timpani", 47),
    // Ensemble
    ("string_ensemble_1", 48),
    ("string_ensemble_2", 49),
    ("synth_strings_1", 50),
    ("synth_strings_2", 51),
    ("choir_aahs", 52),
    ("voice_oohs", 53),
    ("synth_choir", 54),
    ("orchestra_hit", 55),
    // Brass
    ("trumpet", 56),
    ("trombone", 57),
    ("tuba", 58),
    ("muted_trumpet", 59),
    ("french_horn", 60),
    ("brass_section", 61),
    ("synth_brass_1", 62),
    ("synth_brass_2", 63),
    // Reed
    ("soprano_sax", 64),
    ("alto_sax", 65),
    ("tenor_sax", 66),
    ("baritone_sax", 67),
    ("oboe", 68),
    ("english_horn", 69),
    ("bassoon", 70),
    ("clarinet", 71),
    // Pipe
    ("piccolo", 72),
    ("flute", 73),
    ("recorder", 74),
    ("pan_flute", 75),
    ("blown_bottle", 76),
    ("shakuhachi", 77),
    ("whistle", 78),
    ("ocarina", 79),
];

/// Instruments offered by the exercise form
pub const COMMON_INSTRUMENTS: &[&str] = &[
    "piano",
    "trumpet",
    "violin",
    "clarinet",
    "flute",
    "acoustic_guitar_nylon",
    "alto_sax",
];

/// Pre-rendered scale samples per instrument: (instrument, folder, file prefix, scales)
const SAMPLE_SETS: &[(&str, &str, &str, &[&str])] = &[
    ("piano", "piano", "piano", &["c-major", "g-major", "f-major", "a-minor"]),
    ("trumpet", "trumpet", "trumpet", &["c-major", "g-major", "f-major"]),
    ("violin", "violin", "violin", &["c-major", "g-major", "a-minor"]),
    ("clarinet", "clarinet", "clarinet", &["c-major", "f-major"]),
    ("flute", "flute", "flute", &["c-major", "g-major"]),
    ("acoustic_guitar_nylon", "guitar", "guitar", &["c-major", "g-major", "a-minor"]),
    ("alto_sax", "sax", "alto-sax", &["c-major", "g-major"]),
];

pub const DEFAULT_SAMPLE_PATH: &str = "/midi/piano/piano-scale-c-major.mid";

/// Staff clef an instrument reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    Treble,
    Alto,
    Bass,
}

impl Clef {
    /// MusicXML (sign, line)
    pub fn sign_and_line(&self) -> (&'static str, u8) {
        match self {
            Clef::Treble => ("G", 2),
            Clef::Alto => ("C", 3),
            Clef::Bass => ("F", 4),
        }
    }
}

/// General MIDI instrument family (program / 8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Piano,
    ChromaticPercussion,
    Organ,
    Guitar,
    Bass,
    Strings,
    Ensemble,
    Brass,
    Reed,
    Pipe,
}

impl Family {
    pub fn from_program(program: u8) -> Family {
        match program / 8 {
            0 => Family::Piano,
            1 => Family::ChromaticPercussion,
            2 => Family::Organ,
            3 => Family::Guitar,
            4 => Family::Bass,
            5 => Family::Strings,
            6 => Family::Ensemble,
            7 => Family::Brass,
            8 => Family::Reed,
            _ => Family::Pipe,
        }
    }
}

/// Everything the API exposes about one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentInfo {
    pub key: String,
    pub display_name: String,
    pub program: u8,
    pub family: Family,
    pub clef: Clef,
    pub lowest: u8,
    pub highest: u8,
    pub common: bool,
}

/// Normalize free-form names ("Alto Sax", "french-horn") to table keys
pub fn normalize_name(name: &str) -> String {
    let key: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();

    match key.as_str() {
        "guitar" | "acoustic_guitar" => "acoustic_guitar_nylon".to_string(),
        "sax" | "saxophone" | "alto_saxophone" => "alto_sax".to_string(),
        "tenor_saxophone" => "tenor_sax".to_string(),
        "horn" => "french_horn".to_string(),
        "bass" | "double_bass" | "upright_bass" => "contrabass".to_string(),
        "harp" => "orchestral_harp".to_string(),
        _ => key,
    }
}

/// General MIDI program for an instrument name
pub fn program_for(name: &str) -> Option<u8> {
    let key = normalize_name(name);
    INSTRUMENT_PROGRAMS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, program)| *program)
}

/// Whether the name resolves to a known instrument
pub fn is_known(name: &str) -> bool {
    program_for(name).is_some()
}

/// Friendly display name, title-casing unknown keys
pub fn display_name(name: &str) -> String {
    let key = normalize_name(name);
    let known = match key.as_str() {
        "piano" => Some("Piano"),
        "acoustic_piano" => Some("Acoustic Piano"),
        "bright_piano" => Some("Bright Piano"),
        "trumpet" => Some("Trumpet"),
        "violin" => Some("Violin"),
        "clarinet" => Some("Clarinet"),
        "flute" => Some("Flute"),
        "acoustic_guitar_nylon" => Some("Acoustic Guitar"),
        "alto_sax" => Some("Alto Saxophone"),
        _ => None,
    };

    match known {
        Some(name) => name.to_string(),
        None => key
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

pub fn clef_for(name: &str) -> Clef {
    match normalize_name(name).as_str() {
        "viola" => Clef::Alto,
        "cello" | "contrabass" | "trombone" | "tuba" | "bassoon" | "timpani" => Clef::Bass,
        key => match program_for(key).map(Family::from_program) {
            Some(Family::Bass) => Clef::Bass,
            _ => Clef::Treble,
        },
    }
}

/// Comfortable sounding range (lowest, highest) as MIDI note numbers
pub fn playable_range(name: &str) -> (u8, u8) {
    let key = normalize_name(name);
    match key.as_str() {
        "trumpet" | "muted_trumpet" => (54, 82),
        "trombone" => (40, 72),
        "tuba" => (28, 58),
        "french_horn" => (41, 77),
        "violin" => (55, 100),
        "viola" => (48, 88),
        "cello" => (36, 76),
        "contrabass" => (28, 67),
        "flute" => (60, 96),
        "piccolo" => (74, 108),
        "recorder" => (72, 98),
        "clarinet" => (50, 91),
        "oboe" => (58, 91),
        "english_horn" => (52, 81),
        "bassoon" => (34, 75),
        "soprano_sax" => (56, 88),
        "alto_sax" => (49, 81),
        "tenor_sax" => (44, 76),
        "baritone_sax" => (36, 69),
        _ => match program_for(&key).map(Family::from_program) {
            Some(Family::Piano) => (21, 108),
            Some(Family::Guitar) => (40, 88),
            Some(Family::Bass) => (28, 67),
            _ => (36, 96),
        },
    }
}

/// Path of a bundled scale sample, falling back to the C major piano scale
pub fn sample_midi_path(instrument: &str, index: Option<usize>) -> String {
    let key = normalize_name(instrument);
    let Some((_, folder, prefix, scales)) = SAMPLE_SETS.iter().find(|(k, ..)| *k == key) else {
        return DEFAULT_SAMPLE_PATH.to_string();
    };

    let scale = match index {
        Some(i) if i < scales.len() => scales[i],
        _ => scales[0],
    };
    format!("/midi/{}/{}-scale-{}.mid", folder, prefix, scale)
}

/// (instrument key, folder, file prefix) for every instrument with bundled samples
pub fn sample_targets() -> Vec<(&'static str, &'static str, &'static str)> {
    SAMPLE_SETS
        .iter()
        .map(|(key, folder, prefix, _)| (*key, *folder, *prefix))
        .collect()
}

/// Describe one instrument, if known
pub fn instrument_info(name: &str) -> Option<InstrumentInfo> {
    let key = normalize_name(name);
    let program = program_for(&key)?;
    let (lowest, highest) = playable_range(&key);
    Some(InstrumentInfo {
        display_name: display_name(&key),
        program,
        family: Family::from_program(program),
        clef: clef_for(&key),
        lowest,
        highest,
        common: COMMON_INSTRUMENTS.contains(&key.as_str()),
        key,
    })
}

/// Full instrument table in program order
pub fn list_instruments() -> Vec<InstrumentInfo> {
    INSTRUMENT_PROGRAMS
        .iter()
        .filter_map(|(key, _)| instrument_info(key))
        .collect()
}
