// Model note text - Parse the NOTES:/TIPS: answer format into a score
//
// Expected shape:
//   NOTES: C4/q D4/q E4/h R/q G4/e. A4/s
//   TIPS:
//   - Keep the air moving through the rests
//
// Tokens are <pitch>/<value>, where pitch is a note name ("Bb3") or R for a rest
// and value is w/h/q/e/s (or 1/2/4/8/16), optionally followed by "." for a dot.

use serde::{Deserialize, Serialize};

use super::params::ExerciseSpec;
use super::score::{rest_fill, Measure, Score, ScoreNote, DIVISIONS};
use crate::theory::{NoteValue, Pitch};

/// One parsed note token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteToken {
    /// None for a rest
    pub pitch: Option<Pitch>,
    pub value: NoteValue,
    pub dotted: bool,
}

impl NoteToken {
    pub fn duration(&self, divisions: u32) -> u32 {
        let plain = self.value.divisions(divisions);
        if self.dotted {
            plain + plain / 2
        } else {
            plain
        }
    }

    pub fn parse(token: &str) -> Option<NoteToken> {
        let (name, value) = token.trim().split_once('/')?;
        let (value, dotted) = match value.strip_suffix('.') {
            Some(v) => (v, true),
            None => (value, false),
        };
        let value = NoteValue::from_symbol(value)?;
        let pitch = if name.eq_ignore_ascii_case("r") || name.eq_ignore_ascii_case("rest") {
            None
        } else {
            Some(Pitch::parse(name).ok()?)
        };
        Some(NoteToken { pitch, value, dotted })
    }
}

/// Everything recovered from a model answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedNoteText {
    pub tokens: Vec<NoteToken>,
    pub tips: Vec<String>,
    /// Tokens in the NOTES section that could not be read
    pub skipped: Vec<String>,
}

#[derive(PartialEq)]
enum Section {
    Preamble,
    Notes,
    Tips,
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let trimmed = line.trim_start().trim_start_matches(['*', '#']).trim_start();
    let head = trimmed.get(..label.len())?;
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let rest = trimmed[label.len()..].trim_start_matches('*');
    rest.strip_prefix(':').map(|r| r.trim_start_matches('*').trim())
}

/// Strip list markers ("- ", "* ", "1. ", "2) ") from a tip line
fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(r) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return r.trim_start();
        }
    }
    line
}

/// Parse a model answer. Without a NOTES: label, any whitespace-separated token containing
/// a slash is treated as a note candidate.
pub fn parse_note_text(text: &str) -> ParsedNoteText {
    let mut parsed = ParsedNoteText::default();
    let labelled = text.lines().any(|l| strip_label(l, "NOTES").is_some());
    let mut section = if labelled { Section::Preamble } else { Section::Notes };

    for line in text.lines() {
        let body = if let Some(rest) = strip_label(line, "NOTES") {
            section = Section::Notes;
            rest
        } else if let Some(rest) = strip_label(line, "TIPS") {
            section = Section::Tips;
            rest
        } else {
            line
        };

        match section {
            Section::Preamble => {}
            Section::Notes => {
                for word in body.split_whitespace() {
                    let word = word.trim_matches([',', ';', '|', '`']);
                    if word.is_empty() {
                        continue;
                    }
                    if !labelled && !word.contains('/') {
                        continue;
                    }
                    match NoteToken::parse(word) {
                        Some(token) => parsed.tokens.push(token),
                        None => parsed.skipped.push(word.to_string()),
                    }
                }
            }
            Section::Tips => {
                let tip = strip_bullet(body);
                if !tip.is_empty() {
                    parsed.tips.push(tip.to_string());
                }
            }
        }
    }

    parsed
}

/// A score assembled from tokens plus what did not fit
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltScore {
    pub score: Score,
    /// Notes cut short because they were longer than a measure
    pub truncated: usize,
    /// Tokens left over once the requested bar count was full
    pub unused: usize,
}

/// Bar tokens into measures of the exercise meter. A token that does not fit the space left
/// in a measure starts the next one (the gap becomes rests); notes longer than a whole
/// measure are cut at the bar line and reported.
pub fn build_score_from_tokens(tokens: &[NoteToken], spec: &ExerciseSpec, title: &str) -> BuiltScore {
    let mut score = Score::new(title, &spec.instrument, spec.key, spec.time, spec.tempo_bpm);
    let length = score.measure_length();
    let mut truncated = 0;
    let mut unused = 0;
    let mut current = Measure::new(1);

    for token in tokens {
        if score.measures.len() as u32 >= spec.bars {
            unused += 1;
            continue;
        }

        let mut duration = token.duration(DIVISIONS);
        if duration > length {
            duration = length;
            truncated += 1;
        }

        if current.duration() + duration > length {
            let gap = length - current.duration();
            current.notes.extend(rest_fill(gap, DIVISIONS));
            let next = current.number + 1;
            score.measures.push(std::mem::replace(&mut current, Measure::new(next)));
            if score.measures.len() as u32 >= spec.bars {
                unused += 1;
                continue;
            }
        }

        push_written(&mut current, token.pitch, duration);

        if current.duration() == length {
            let next = current.number + 1;
            score.measures.push(std::mem::replace(&mut current, Measure::new(next)));
        }
    }

    if !current.notes.is_empty() && (score.measures.len() as u32) < spec.bars {
        let gap = length - current.duration();
        current.notes.extend(rest_fill(gap, DIVISIONS));
        score.measures.push(current);
    }

    BuiltScore {
        score,
        truncated,
        unused,
    }
}

/// Add a note whose length may not be a single written value (a truncated whole note in 5/8),
/// writing the longest value that fits and resting for the rest
fn push_written(measure: &mut Measure, pitch: Option<Pitch>, duration: u32) {
    if NoteValue::from_divisions(duration, DIVISIONS).is_some() {
        measure.notes.push(ScoreNote { pitch, duration });
        return;
    }
    let written = NoteValue::ALL
        .iter()
        .map(|v| v.divisions(DIVISIONS))
        .find(|&d| d > 0 && d <= duration)
        .unwrap_or(duration);
    measure.notes.push(ScoreNote {
        pitch,
        duration: written,
    });
    measure.notes.extend(rest_fill(duration - written, DIVISIONS));
}
