// MusicXML writer - Render a score as a MusicXML 3.1 partwise document
// Attributes (divisions, key, time, clef) and the tempo marking go in the first measure

use chrono::NaiveDate;
use std::fmt::Write;

use super::escape_xml;
use crate::exercise::score::{Score, ScoreNote};
use crate::midi::instruments;
use crate::theory::{Mode, NoteValue};

pub const DOCTYPE: &str = r#"<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">"#;
pub const COMPOSER: &str = "HarmonyHub AI";
pub const MODEL_COMPOSER: &str = "HarmonyHub AI (Mistral 7B)";
pub const SOFTWARE: &str = "HarmonyHub";

/// Identification block values
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreHeader {
    pub composer: String,
    pub encoding_date: NaiveDate,
}

impl ScoreHeader {
    pub fn new(composer: &str, encoding_date: NaiveDate) -> Self {
        ScoreHeader {
            composer: composer.to_string(),
            encoding_date,
        }
    }

    /// Procedural composer credit, dated today
    pub fn today() -> Self {
        ScoreHeader::new(COMPOSER, chrono::Utc::now().date_naive())
    }
}

/// Render the score. Every string that came from a request is escaped.
pub fn write_score(score: &Score, header: &ScoreHeader) -> String {
    let mut xml = String::with_capacity(256 + score.measures.len() * 512);
    let part_name = instruments::display_name(&score.instrument);

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(DOCTYPE);
    xml.push('\n');
    xml.push_str("<score-partwise version=\"3.1\">\n");

    let _ = write!(
        xml,
        "  <work>\n    <work-title>{}</work-title>\n  </work>\n",
        escape_xml(&score.title)
    );
    let _ = write!(
        xml,
        "  <identification>\n    <creator type=\"composer\">{}</creator>\n    <encoding>\n      <software>{}</software>\n      <encoding-date>{}</encoding-date>\n    </encoding>\n  </identification>\n",
        escape_xml(&header.composer),
        SOFTWARE,
        header.encoding_date.format("%Y-%m-%d")
    );
    let _ = write!(
        xml,
        "  <part-list>\n    <score-part id=\"P1\">\n      <part-name>{}</part-name>\n    </score-part>\n  </part-list>\n",
        escape_xml(&part_name)
    );

    xml.push_str("  <part id=\"P1\">\n");
    for (index, measure) in score.measures.iter().enumerate() {
        let _ = writeln!(xml, "    <measure number=\"{}\">", measure.number);
        if index == 0 {
            write_attributes(&mut xml, score);
            write_tempo(&mut xml, score.tempo_bpm);
        }
        for note in &measure.notes {
            write_note(&mut xml, note, score.divisions);
        }
        xml.push_str("    </measure>\n");
    }
    xml.push_str("  </part>\n");
    xml.push_str("</score-partwise>\n");

    xml
}

fn write_attributes(xml: &mut String, score: &Score) {
    let mode = match score.key.mode {
        Mode::Major => "major",
        Mode::Minor => "minor",
    };
    let (sign, line) = instruments::clef_for(&score.instrument).sign_and_line();

    xml.push_str("      <attributes>\n");
    let _ = writeln!(xml, "        <divisions>{}</divisions>", score.divisions);
    let _ = write!(
        xml,
        "        <key>\n          <fifths>{}</fifths>\n          <mode>{}</mode>\n        </key>\n",
        score.key.fifths(),
        mode
    );
    let _ = write!(
        xml,
        "        <time>\n          <beats>{}</beats>\n          <beat-type>{}</beat-type>\n        </time>\n",
        score.time.numerator, score.time.denominator
    );
    let _ = write!(
        xml,
        "        <clef>\n          <sign>{}</sign>\n          <line>{}</line>\n        </clef>\n",
        sign, line
    );
    xml.push_str("      </attributes>\n");
}

fn write_tempo(xml: &mut String, bpm: u16) {
    let _ = write!(
        xml,
        "      <direction placement=\"above\">\n        <direction-type>\n          <metronome>\n            <beat-unit>quarter</beat-unit>\n            <per-minute>{bpm}</per-minute>\n          </metronome>\n        </direction-type>\n        <sound tempo=\"{bpm}\"/>\n      </direction>\n"
    );
}

fn write_note(xml: &mut String, note: &ScoreNote, divisions: u32) {
    xml.push_str("      <note>\n");
    match note.pitch {
        Some(pitch) => {
            xml.push_str("        <pitch>\n");
            let _ = writeln!(xml, "          <step>{}</step>", pitch.step.as_str());
            if pitch.alter != 0 {
                let _ = writeln!(xml, "          <alter>{}</alter>", pitch.alter);
            }
            let _ = writeln!(xml, "          <octave>{}</octave>", pitch.octave);
            xml.push_str("        </pitch>\n");
        }
        None => xml.push_str("        <rest/>\n"),
    }
    let _ = writeln!(xml, "        <duration>{}</duration>", note.duration);
    if let Some((value, dotted)) = NoteValue::from_divisions(note.duration, divisions) {
        let _ = writeln!(xml, "        <type>{}</type>", value.type_name());
        if dotted {
            xml.push_str("        <dot/>\n");
        }
    }
    xml.push_str("      </note>\n");
}
