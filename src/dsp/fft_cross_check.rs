//! Offline FFT-based spectral flux, used only as a companion cross-check
//! against the Goertzel-based novelty path (`dsp::NoveltyFlux`) -- never
//! called on the AudioTask hot path. The realtime onset path doesn't need
//! full-resolution FFT since Goertzel already covers the realtime bands,
//! but an independent full-resolution spectrum stays useful for validating
//! that path's flux in diagnostics and tests.

use rustfft::{num_complex::Complex, FftPlanner};

/// Higher resolution than the realtime Goertzel bands, appropriate for an
/// offline cross-check rather than per-hop tracking.
pub const FFT_SIZE: usize = 1024;

pub struct FftCrossCheck {
    planner: FftPlanner<f32>,
    window: Vec<f32>,
    prev_spectrum: Vec<f32>,
}

impl FftCrossCheck {
    pub fn new() -> Self {
        let window: Vec<f32> = (0..FFT_SIZE)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (FFT_SIZE as f32 - 1.0)).cos()))
            .collect();
        Self {
            planner: FftPlanner::new(),
            window,
            prev_spectrum: vec![0.0; FFT_SIZE / 2 + 1],
        }
    }

    /// Computes the Hann-windowed magnitude spectrum of `samples` (truncated
    /// or zero-padded to `FFT_SIZE`).
    pub fn magnitude_spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = Vec::with_capacity(FFT_SIZE);
        for (i, &s) in samples.iter().take(FFT_SIZE).enumerate() {
            buffer.push(Complex::new(s * self.window[i], 0.0));
        }
        while buffer.len() < FFT_SIZE {
            buffer.push(Complex::new(0.0, 0.0));
        }

        let fft = self.planner.plan_fft_forward(FFT_SIZE);
        fft.process(&mut buffer);

        buffer[..FFT_SIZE / 2 + 1].iter().map(|c| c.norm()).collect()
    }

    /// Half-wave-rectified spectral flux between the previous and current
    /// window's magnitude spectra, the same shape as `dsp::NoveltyFlux`'s
    /// band-domain flux but computed over the full FFT bin set.
    pub fn flux(&mut self, samples: &[f32]) -> f32 {
        let spectrum = self.magnitude_spectrum(samples);
        let flux: f32 = spectrum
            .iter()
            .zip(self.prev_spectrum.iter())
            .map(|(&cur, &prev)| (cur - prev).max(0.0))
            .sum();
        self.prev_spectrum = spectrum;
        flux
    }
}

impl Default for FftCrossCheck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        let step = 2.0 * std::f32::consts::PI * freq / sample_rate;
        (0..n).map(|i| (i as f32 * step).sin()).collect()
    }

    #[test]
    fn silence_has_zero_flux() {
        let mut check = FftCrossCheck::new();
        let silence = vec![0.0f32; FFT_SIZE];
        check.flux(&silence);
        assert_eq!(check.flux(&silence), 0.0);
    }

    #[test]
    fn onset_transient_raises_flux_above_steady_state() {
        let mut check = FftCrossCheck::new();
        let silence = vec![0.0f32; FFT_SIZE];
        let tone = sine(1000.0, 16_000.0, FFT_SIZE);

        check.flux(&silence);
        let steady = check.flux(&silence);
        let onset = check.flux(&tone);

        assert!(onset > steady, "a sudden tone onset should register more flux than silence-to-silence");
    }

    #[test]
    fn steady_tone_settles_to_low_flux() {
        let mut check = FftCrossCheck::new();
        let tone = sine(1000.0, 16_000.0, FFT_SIZE);
        check.flux(&tone);
        check.flux(&tone);
        let settled = check.flux(&tone);
        assert!(settled < 1.0, "a repeated identical tone window should have near-zero flux once settled");
    }
}
