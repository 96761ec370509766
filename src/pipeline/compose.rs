// Score composition - Procedural scores and scores written by the language model

use crate::exercise::metadata::suggested_improvements;
use crate::exercise::{build_score_from_tokens, generate_score, parse_note_text, random_seed, ExerciseSpec, Score, Source};
use crate::inference::ChatMessage;
use crate::notation::{scale_fallback_score, COMPOSER, MODEL_COMPOSER};

/// Answers with fewer pitched notes than this are not used
pub const MIN_MODEL_NOTES: usize = 4;

pub const COMPOSER_PROMPT: &str = "You are a professional music teacher and composer specializing in creating MIDI exercises.
Given the parameters provided, generate appropriate musical exercises that help students improve their skills.
Your response should include a music sequence in a format that can be converted to MIDI.";

const FORMAT_INSTRUCTIONS: &str = "Write the notes on one line starting with NOTES: as space-separated tokens <pitch>/<value>. \
Pitch is a note name such as C4, F#4 or Bb3, or R for a rest. Value is w, h, q, e or s, with a trailing . for a dotted note. \
Then write TIPS: followed by up to three short practice tips, one per line starting with -.";

/// A score and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub score: Score,
    pub source: Source,
    /// Credited in the MusicXML identification block
    pub composer: &'static str,
    pub seed: Option<u64>,
    pub tips: Vec<String>,
}

/// Seeded procedural score. `source` is Procedural, or Fallback when standing in for the model.
pub fn compose_procedural(spec: &ExerciseSpec, source: Source) -> Composition {
    let seed = spec.seed.unwrap_or_else(random_seed);
    let mut score = generate_score(spec, seed);
    if score.sounding_count() == 0 || !score.is_well_formed() {
        log::warn!("Generated score for seed {} is unusable, serving the scale template", seed);
        score = scale_fallback_score(&score.title, &spec.instrument);
    }
    Composition {
        score,
        source,
        composer: COMPOSER,
        seed: Some(seed),
        tips: suggested_improvements(&spec.focus_type),
    }
}

/// System prompt, then the parameter list and the user's request
pub fn composer_messages(spec: &ExerciseSpec, prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!("{}\n{}", COMPOSER_PROMPT, FORMAT_INSTRUCTIONS)),
        ChatMessage::user(format!(
            "Parameters:\n- Instrument: {}\n- Difficulty: {}\n- Key: {}\n- Time Signature: {}\n- Focus: {} - {}\n- Number of bars: {}\n\nUser Prompt: {}\n\nGenerate a musical exercise based on these parameters.",
            spec.instrument,
            spec.level.as_str(),
            spec.key_name,
            spec.time,
            spec.focus_type,
            spec.focus_value,
            spec.bars,
            prompt.trim()
        )),
    ]
}

/// Build a score from a model answer, or None when it has too few usable notes
pub fn compose_from_answer(spec: &ExerciseSpec, answer: &str, title: &str) -> Option<Composition> {
    let parsed = parse_note_text(answer);
    if !parsed.skipped.is_empty() {
        log::debug!("Skipped {} unreadable note tokens: {:?}", parsed.skipped.len(), parsed.skipped);
    }

    let pitched = parsed.tokens.iter().filter(|t| t.pitch.is_some()).count();
    if pitched < MIN_MODEL_NOTES {
        log::warn!("Model answer has {} usable notes, need {}", pitched, MIN_MODEL_NOTES);
        return None;
    }

    let built = build_score_from_tokens(&parsed.tokens, spec, title);
    if built.truncated > 0 || built.unused > 0 {
        log::info!(
            "Model score: {} notes cut at the bar line, {} tokens past the last bar",
            built.truncated,
            built.unused
        );
    }
    if built.score.sounding_count() == 0 {
        return None;
    }

    let tips = if parsed.tips.is_empty() {
        suggested_improvements(&spec.focus_type)
    } else {
        parsed.tips
    };

    Some(Composition {
        score: built.score,
        source: Source::Model,
        composer: MODEL_COMPOSER,
        seed: None,
        tips,
    })
}
