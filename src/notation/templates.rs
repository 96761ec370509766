// Canned scores - Served when neither the model nor the caller supplies notes

use crate::exercise::score::{Measure, Score, ScoreNote, DIVISIONS};
use crate::theory::{Key, Pitch, Step, TimeSignature};

pub const FALLBACK_TEMPO_BPM: u16 = 120;

/// Two measures of quarter notes, C4 up to C5, in C major 4/4
pub fn scale_fallback_score(title: &str, instrument: &str) -> Score {
    let mut score = Score::new(title, instrument, Key::default(), TimeSignature::default(), FALLBACK_TEMPO_BPM);
    let pitches: Vec<Pitch> = Step::ALL
        .iter()
        .map(|&step| Pitch::new(step, 0, 4))
        .chain(std::iter::once(Pitch::new(Step::C, 0, 5)))
        .collect();

    for (number, bar) in pitches.chunks(4).enumerate() {
        let mut measure = Measure::new(number as u32 + 1);
        measure
            .notes
            .extend(bar.iter().map(|&p| ScoreNote::note(p, DIVISIONS)));
        score.measures.push(measure);
    }
    score
}
