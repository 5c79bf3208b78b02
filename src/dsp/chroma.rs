//! 12 pitch-class chromagram folded from 48 note-frequency Goertzels
//! (4 octaves, equal temperament, A4 = 440 Hz).

use crate::time::HOP_SIZE;

pub const NUM_CHROMA: usize = 12;
const NUM_OCTAVES: usize = 4;
const NUM_NOTES: usize = NUM_CHROMA * NUM_OCTAVES;
const WINDOW_SIZE: usize = 512;

/// C2 through B5, equal temperament, A4 = 440 Hz.
const NOTE_FREQS: [f32; NUM_NOTES] = [
    // Octave 2
    65.41, 69.30, 73.42, 77.78, 82.41, 87.31, 92.50, 98.00, 103.83, 110.00, 116.54, 123.47,
    // Octave 3
    130.81, 138.59, 146.83, 155.56, 164.81, 174.61, 185.00, 196.00, 207.65, 220.00, 233.08, 246.94,
    // Octave 4
    261.63, 277.18, 293.66, 311.13, 329.63, 349.23, 369.99, 392.00, 415.30, 440.00, 466.16, 493.88,
    // Octave 5
    523.25, 554.37, 587.33, 622.25, 659.25, 698.46, 739.99, 783.99, 830.61, 880.00, 932.33, 987.77,
];

/// Per-octave weight applied before folding into pitch classes: 0.5 per
/// octave away from the lowest, so higher octaves contribute less.
const OCTAVE_WEIGHT: f32 = 0.5;

struct Coeff {
    k: f32,
}

impl Coeff {
    fn new(target_freq: f32, sample_rate: f32, window_size: usize) -> Self {
        let bin = (target_freq * window_size as f32 / sample_rate).round();
        let omega = 2.0 * std::f32::consts::PI * bin / window_size as f32;
        Self { k: 2.0 * omega.cos() }
    }

    fn magnitude(&self, buffer: &[f32]) -> f32 {
        let mut s1 = 0.0f32;
        let mut s2 = 0.0f32;
        for &x in buffer {
            let s0 = x + self.k * s1 - s2;
            s2 = s1;
            s1 = s0;
        }
        (s1 * s1 + s2 * s2 - self.k * s1 * s2).max(0.0).sqrt()
    }
}

pub struct ChromaAnalyzer {
    window: [f32; WINDOW_SIZE],
    write_idx: usize,
    hops_since_analysis: u32,
    coeffs: Vec<Coeff>,
    norm: f32,
    last_output: [f32; NUM_CHROMA],
}

impl ChromaAnalyzer {
    pub fn new(sample_rate_hz: f32) -> Self {
        let coeffs = NOTE_FREQS
            .iter()
            .map(|&f| Coeff::new(f, sample_rate_hz, WINDOW_SIZE))
            .collect();
        Self {
            window: [0.0; WINDOW_SIZE],
            write_idx: 0,
            hops_since_analysis: 0,
            coeffs,
            norm: 2.0 / WINDOW_SIZE as f32,
            last_output: [0.0; NUM_CHROMA],
        }
    }

    pub fn reset(&mut self) {
        self.window = [0.0; WINDOW_SIZE];
        self.write_idx = 0;
        self.hops_since_analysis = 0;
        self.last_output = [0.0; NUM_CHROMA];
    }

    pub fn write_hop(&mut self, hop: &[f32]) {
        debug_assert_eq!(hop.len(), HOP_SIZE);
        for &s in hop {
            self.window[self.write_idx] = s;
            self.write_idx = (self.write_idx + 1) % WINDOW_SIZE;
        }
        self.hops_since_analysis += 1;
    }

    pub fn analyze(&mut self, out: &mut [f32; NUM_CHROMA]) -> bool {
        if self.hops_since_analysis == 0 {
            return false;
        }
        self.hops_since_analysis = 0;

        let mut linear = [0.0f32; WINDOW_SIZE];
        for i in 0..WINDOW_SIZE {
            linear[i] = self.window[(self.write_idx + i) % WINDOW_SIZE];
        }

        let mut folded = [0.0f32; NUM_CHROMA];
        for note_idx in 0..NUM_NOTES {
            let octave = note_idx / NUM_CHROMA;
            let pitch_class = note_idx % NUM_CHROMA;
            let weight = OCTAVE_WEIGHT.powi(octave as i32);
            let mag = self.coeffs[note_idx].magnitude(&linear) * self.norm;
            folded[pitch_class] += mag * weight;
        }

        for c in 0..NUM_CHROMA {
            out[c] = folded[c].clamp(0.0, 1.0);
        }
        self.last_output = *out;
        true
    }

    pub fn last_output(&self) -> [f32; NUM_CHROMA] {
        self.last_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn a4_concentrates_energy_on_a_pitch_class() {
        let mut analyzer = ChromaAnalyzer::new(16_000.0);
        let mut phase = 0.0;
        let mut out = [0.0; NUM_CHROMA];
        for _ in 0..4 {
            let mut hop = [0.0; HOP_SIZE];
            for s in hop.iter_mut() {
                *s = phase.sin();
                phase += 2.0 * PI * 440.0 / 16_000.0;
            }
            analyzer.write_hop(&hop);
            analyzer.analyze(&mut out);
        }
        // Pitch class index for A: A2=9, A3=9, ... all map to index 9
        let max_idx = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(max_idx, 9);
    }

    #[test]
    fn output_bounded_and_gated_by_window_fill() {
        let mut analyzer = ChromaAnalyzer::new(16_000.0);
        let mut out = [0.0; NUM_CHROMA];
        assert!(!analyzer.analyze(&mut out));
        analyzer.write_hop(&[0.0; HOP_SIZE]);
        assert!(analyzer.analyze(&mut out));
        assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
