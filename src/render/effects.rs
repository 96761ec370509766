// Master effects - Limiting and level control on the mixed preview

/// Soft limiting above the threshold
pub fn soft_limit(sample: f32, threshold: f32) -> f32 {
    if sample.abs() <= threshold {
        sample
    } else {
        let sign = sample.signum();
        sign * (threshold + (sample.abs() - threshold).tanh() * (1.0 - threshold))
    }
}

/// Scale so the loudest sample reaches `target`; silence is left alone
pub fn normalize_peak(samples: &mut [f32], target: f32) {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        let gain = target / peak;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}
