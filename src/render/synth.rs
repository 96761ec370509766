// Synthesizer voices - Harmonic profiles and envelopes per instrument family

use std::f64::consts::TAU;

use crate::midi::instruments::Family;

/// Relative harmonic amplitudes and envelope times for a family
#[derive(Debug, Clone, PartialEq)]
pub struct Timbre {
    pub harmonics: &'static [f32],
    pub attack: f64,
    pub release: f64,
    /// Exponential decay rate while held; 0 for sustained instruments
    pub decay: f64,
}

pub fn timbre_for(family: Family) -> Timbre {
    match family {
        Family::Piano | Family::ChromaticPercussion | Family::Guitar => Timbre {
            harmonics: &[1.0, 0.5, 0.25, 0.12, 0.06],
            attack: 0.005,
            release: 0.08,
            decay: 3.0,
        },
        Family::Bass => Timbre {
            harmonics: &[1.0, 0.6, 0.2],
            attack: 0.01,
            release: 0.08,
            decay: 2.0,
        },
        Family::Strings | Family::Ensemble => Timbre {
            harmonics: &[1.0, 0.7, 0.5, 0.35, 0.25, 0.15],
            attack: 0.06,
            release: 0.12,
            decay: 0.0,
        },
        Family::Brass => Timbre {
            harmonics: &[1.0, 0.8, 0.6, 0.45, 0.3, 0.2, 0.1],
            attack: 0.04,
            release: 0.08,
            decay: 0.0,
        },
        Family::Reed => Timbre {
            harmonics: &[1.0, 0.1, 0.5, 0.08, 0.3, 0.05, 0.15],
            attack: 0.03,
            release: 0.06,
            decay: 0.0,
        },
        Family::Organ | Family::Pipe => Timbre {
            harmonics: &[1.0, 0.2, 0.08],
            attack: 0.03,
            release: 0.05,
            decay: 0.0,
        },
    }
}

/// Linear attack and release around a (possibly decaying) sustain
pub fn envelope(t: f64, length: f64, timbre: &Timbre) -> f32 {
    if t < 0.0 || t >= length {
        return 0.0;
    }
    let attack = if timbre.attack > 0.0 { (t / timbre.attack).min(1.0) } else { 1.0 };
    let remaining = length - t;
    let release = if timbre.release > 0.0 { (remaining / timbre.release).min(1.0) } else { 1.0 };
    let sustain = (-timbre.decay * t).exp();
    (attack * release * sustain) as f32
}

/// One note, `length` seconds long. Harmonics above Nyquist are left out.
pub fn render_note(freq: f64, length: f64, timbre: &Timbre, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate as f64;
    let samples = (length * rate).round() as usize;
    let nyquist = rate / 2.0;
    let partials: Vec<(f64, f32)> = timbre
        .harmonics
        .iter()
        .enumerate()
        .map(|(n, &amp)| (freq * (n + 1) as f64, amp))
        .filter(|(f, _)| *f < nyquist)
        .collect();
    let norm: f32 = partials.iter().map(|(_, a)| a).sum::<f32>().max(1.0);

    (0..samples)
        .map(|i| {
            let t = i as f64 / rate;
            let wave: f32 = partials
                .iter()
                .map(|&(f, amp)| amp * (TAU * f * t).sin() as f32)
                .sum();
            wave / norm * envelope(t, length, timbre)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let timbre = timbre_for(Family::Brass);
        assert_eq!(envelope(0.0, 1.0, &timbre), 0.0);
        assert!((envelope(0.5, 1.0, &timbre) - 1.0).abs() < 1e-6);
        assert!(envelope(0.99, 1.0, &timbre) < 0.2);
        assert_eq!(envelope(1.0, 1.0, &timbre), 0.0);
    }

    #[test]
    fn test_piano_decays() {
        let timbre = timbre_for(Family::Piano);
        assert!(envelope(0.8, 2.0, &timbre) < envelope(0.1, 2.0, &timbre));
    }

    #[test]
    fn test_render_note_length_and_level() {
        let samples = render_note(440.0, 0.5, &timbre_for(Family::Strings), 8000);
        assert_eq!(samples.len(), 4000);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
        assert!(samples.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_harmonics_above_nyquist_dropped() {
        // At 8 kHz only the fundamental of 3 kHz survives, so the peak stays bounded
        let samples = render_note(3000.0, 0.1, &timbre_for(Family::Brass), 8000);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }
}
