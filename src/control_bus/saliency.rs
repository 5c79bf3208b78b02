//! Four scalar saliency measures consumed by style classification and by
//! downstream effects (out of scope here) for mood-style selection.

use super::{NUM_BANDS, NUM_CHROMA};
use serde::{Deserialize, Serialize};

const CENTROID_HISTORY_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MusicalSaliency {
    pub harmonic: f32,
    pub rhythmic: f32,
    pub timbral: f32,
    pub dynamic_novelty: f32,
}

pub struct SaliencyTracker {
    rhythmic_smoothed: f32,
    centroid_history: Vec<f32>,
}

impl SaliencyTracker {
    pub fn new() -> Self {
        Self {
            rhythmic_smoothed: 0.0,
            centroid_history: Vec::with_capacity(CENTROID_HISTORY_LEN),
        }
    }

    pub fn reset(&mut self) {
        self.rhythmic_smoothed = 0.0;
        self.centroid_history.clear();
    }

    pub fn update(
        &mut self,
        chroma: &[f32; NUM_CHROMA],
        tempo_confidence: f32,
        bands: &[f32; NUM_BANDS],
        flux: f32,
    ) -> MusicalSaliency {
        let harmonic = chroma_concentration(chroma);

        self.rhythmic_smoothed += (tempo_confidence - self.rhythmic_smoothed) * 0.05;

        let centroid = band_centroid(bands);
        if self.centroid_history.len() == CENTROID_HISTORY_LEN {
            self.centroid_history.remove(0);
        }
        self.centroid_history.push(centroid);
        let timbral = centroid_drift(&self.centroid_history);

        MusicalSaliency {
            harmonic,
            rhythmic: self.rhythmic_smoothed.clamp(0.0, 1.0),
            timbral: timbral.clamp(0.0, 1.0),
            dynamic_novelty: flux.clamp(0.0, 1.0),
        }
    }
}

impl Default for SaliencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Entropy-like concentration: `1 - normalized_entropy`, so a single
/// dominant pitch class scores near 1 and a flat distribution scores near
/// 0.
fn chroma_concentration(chroma: &[f32; NUM_CHROMA]) -> f32 {
    let total: f32 = chroma.iter().sum::<f32>().max(1e-6);
    let mut entropy = 0.0;
    for &c in chroma {
        let p = c / total;
        if p > 1e-6 {
            entropy -= p * p.ln();
        }
    }
    let max_entropy = (NUM_CHROMA as f32).ln();
    (1.0 - entropy / max_entropy).clamp(0.0, 1.0)
}

fn band_centroid(bands: &[f32; NUM_BANDS]) -> f32 {
    use crate::dsp::goertzel::BAND_CENTER_HZ;
    let energy: f32 = bands.iter().sum::<f32>().max(1e-6);
    let weighted: f32 = bands.iter().zip(BAND_CENTER_HZ.iter()).map(|(b, f)| b * f).sum();
    weighted / energy
}

fn centroid_drift(history: &[f32]) -> f32 {
    if history.len() < 2 {
        return 0.0;
    }
    let mean = history.iter().sum::<f32>() / history.len() as f32;
    let variance = history.iter().map(|c| (c - mean) * (c - mean)).sum::<f32>() / history.len() as f32;
    // Normalize by the span of the 8 band center frequencies so the result
    // sits in a sane [0,1]-ish range before clamping.
    (variance.sqrt() / 2000.0).clamp(0.0, 1.0)
}
