//! Deterministic PCM generators: silence, tone bursts, click trains, and
//! noise bursts. Used by unit/integration tests and by the `lumacore-diag`
//! binary's `--synthetic` fixtures so both see identical signals.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A fixed seed keeps `white_noise_burst`/`click_train` reproducible across
/// runs -- no two test runs should see different onset timing.
const FIXTURE_SEED: u64 = 0x4C554D41; // "LUMA"

/// `num_hops` hops (`HOP_SIZE` samples each) of digital silence.
pub fn silence(num_hops: usize) -> Vec<i16> {
    vec![0i16; num_hops * crate::time::HOP_SIZE]
}

/// A full-scale sine burst at `freq_hz`, `duration_s` seconds long, at the
/// given `sample_rate_hz`.
pub fn sine_burst(freq_hz: f32, duration_s: f32, sample_rate_hz: f32, amplitude: f32) -> Vec<i16> {
    let n = (duration_s * sample_rate_hz) as usize;
    let mut out = Vec::with_capacity(n);
    let mut phase = 0.0f32;
    let step = 2.0 * std::f32::consts::PI * freq_hz / sample_rate_hz;
    for _ in 0..n {
        let sample = (phase.sin() * amplitude * i16::MAX as f32) as i16;
        out.push(sample);
        phase += step;
    }
    out
}

/// `duration_s` seconds of seeded white noise at `amplitude` (`[0,1]` of
/// full scale).
pub fn white_noise_burst(duration_s: f32, sample_rate_hz: f32, amplitude: f32) -> Vec<i16> {
    let n = (duration_s * sample_rate_hz) as usize;
    let mut rng = StdRng::seed_from_u64(FIXTURE_SEED);
    (0..n)
        .map(|_| (rng.gen_range(-1.0f32..=1.0) * amplitude * i16::MAX as f32) as i16)
        .collect()
}

/// A metronome-style click train: `click_ms` of white noise at `bpm`
/// intervals, for `total_s` seconds, padded with silence between clicks.
/// Used for tempo-tracker lock/alias tests.
pub fn click_train(bpm: f32, click_ms: f32, total_s: f32, sample_rate_hz: f32, amplitude: f32) -> Vec<i16> {
    let total_samples = (total_s * sample_rate_hz) as usize;
    let click_samples = ((click_ms / 1000.0) * sample_rate_hz) as usize;
    let period_samples = ((60.0 / bpm) * sample_rate_hz) as usize;
    let mut rng = StdRng::seed_from_u64(FIXTURE_SEED);

    let mut out = vec![0i16; total_samples];
    let mut pos = 0;
    while pos < total_samples {
        let end = (pos + click_samples).min(total_samples);
        for slot in out[pos..end].iter_mut() {
            *slot = (rng.gen_range(-1.0f32..=1.0) * amplitude * i16::MAX as f32) as i16;
        }
        pos += period_samples.max(1);
    }
    out
}

/// Two click trains back to back: `bpm_a` for `seconds_a`, then `bpm_b` for
/// `seconds_b`. Models a tempo change partway through a track -- the
/// "half-time trap" that a naive tracker would alias to a harmonic of the
/// old tempo instead of re-locking onto the new one.
pub fn tempo_change_click_train(
    bpm_a: f32,
    seconds_a: f32,
    bpm_b: f32,
    seconds_b: f32,
    click_ms: f32,
    sample_rate_hz: f32,
    amplitude: f32,
) -> Vec<i16> {
    let mut out = click_train(bpm_a, click_ms, seconds_a, sample_rate_hz, amplitude);
    out.extend(click_train(bpm_b, click_ms, seconds_b, sample_rate_hz, amplitude));
    out
}

/// A single full-scale hop-length impulse surrounded by silence, for
/// clipping/AGC-freeze tests.
pub fn clipping_impulse(lead_in_hops: usize, trail_hops: usize) -> Vec<i16> {
    let mut out = silence(lead_in_hops);
    out.extend(vec![i16::MAX; crate::time::HOP_SIZE]);
    out.extend(silence(trail_hops));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_burst_is_bounded_and_nonzero() {
        let samples = sine_burst(1000.0, 0.1, 16_000.0, 1.0);
        assert!(!samples.is_empty());
        assert!(samples.iter().any(|&s| s != 0));
    }

    #[test]
    fn click_train_is_deterministic() {
        let a = click_train(120.0, 60.0, 2.0, 16_000.0, 1.0);
        let b = click_train(120.0, 60.0, 2.0, 16_000.0, 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn click_train_has_silent_gaps_between_clicks() {
        let samples = click_train(60.0, 30.0, 1.0, 16_000.0, 1.0);
        // A 30ms click at 60 BPM (1s period) leaves most of the period
        // silent.
        let nonzero = samples.iter().filter(|&&s| s != 0).count();
        assert!(nonzero < samples.len() / 4);
    }

    #[test]
    fn clipping_impulse_saturates_one_hop() {
        let samples = clipping_impulse(4, 4);
        let hop = crate::time::HOP_SIZE;
        assert!(samples[..4 * hop].iter().all(|&s| s == 0));
        assert!(samples[4 * hop..5 * hop].iter().all(|&s| s == i16::MAX));
    }
}
