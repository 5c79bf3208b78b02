//! Chord detection from smoothed chroma: finds the argmax pitch class,
//! then checks for major/minor/diminished/augmented interval energies.

use super::NUM_CHROMA;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChordType {
    None = 0,
    Major = 1,
    Minor = 2,
    Diminished = 3,
    Augmented = 4,
}

impl Default for ChordType {
    fn default() -> Self {
        ChordType::None
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChordState {
    pub root_note: u8,
    pub chord_type: ChordType,
    pub confidence: f32,
    pub root_strength: f32,
    pub third_strength: f32,
    pub fifth_strength: f32,
}

const REQUIRED_INTERVAL_FRACTION: f32 = 0.5;
const TRIAD_ENERGY_RATIO: f32 = 0.3;

pub struct ChordDetector {
    last: ChordState,
}

impl ChordDetector {
    pub fn new() -> Self {
        Self {
            last: ChordState::default(),
        }
    }

    pub fn reset(&mut self) {
        self.last = ChordState::default();
    }

    pub fn detect(&mut self, chroma: &[f32; NUM_CHROMA]) -> ChordState {
        let (root, root_strength) = argmax(chroma);
        let total_energy: f32 = chroma.iter().sum::<f32>().max(1e-6);

        let candidates: [(ChordType, u8, u8); 4] = [
            (ChordType::Major, 4, 7),
            (ChordType::Minor, 3, 7),
            (ChordType::Diminished, 3, 6),
            (ChordType::Augmented, 4, 8),
        ];

        let mut best: Option<(ChordType, f32, f32, f32)> = None;
        for (chord_type, third_interval, fifth_interval) in candidates {
            let third_strength = chroma[pc(root, third_interval)];
            let fifth_strength = chroma[pc(root, fifth_interval)];

            let required = REQUIRED_INTERVAL_FRACTION * root_strength;
            if third_strength <= required || fifth_strength <= required {
                continue;
            }

            let triad_energy = root_strength + third_strength + fifth_strength;
            if triad_energy / total_energy <= TRIAD_ENERGY_RATIO {
                continue;
            }

            let confidence = (triad_energy / total_energy).min(1.0);
            let better = best.as_ref().map(|(_, c, ..)| confidence > *c).unwrap_or(true);
            if better {
                best = Some((chord_type, confidence, third_strength, fifth_strength));
            }
        }

        self.last = match best {
            Some((chord_type, confidence, third_strength, fifth_strength)) => ChordState {
                root_note: root as u8,
                chord_type,
                confidence,
                root_strength,
                third_strength,
                fifth_strength,
            },
            None => ChordState {
                root_note: root as u8,
                chord_type: ChordType::None,
                confidence: 0.0,
                root_strength,
                third_strength: 0.0,
                fifth_strength: 0.0,
            },
        };
        self.last
    }
}

impl Default for ChordDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn pc(root: usize, interval: u8) -> usize {
    (root + interval as usize) % NUM_CHROMA
}

fn argmax(chroma: &[f32; NUM_CHROMA]) -> (usize, f32) {
    let mut best_idx = 0;
    let mut best_val = chroma[0];
    for (i, &v) in chroma.iter().enumerate().skip(1) {
        if v > best_val {
            best_val = v;
            best_idx = i;
        }
    }
    (best_idx, best_val)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_major_triad_on_c() {
        let mut detector = ChordDetector::new();
        let mut chroma = [0.05; NUM_CHROMA];
        chroma[0] = 1.0; // C root
        chroma[4] = 0.8; // major third
        chroma[7] = 0.8; // perfect fifth
        let state = detector.detect(&chroma);
        assert_eq!(state.root_note, 0);
        assert_eq!(state.chord_type, ChordType::Major);
        assert!(state.confidence > 0.0);
    }

    #[test]
    fn flat_chroma_yields_no_chord() {
        let mut detector = ChordDetector::new();
        let chroma = [0.2; NUM_CHROMA];
        let state = detector.detect(&chroma);
        assert_eq!(state.chord_type, ChordType::None);
    }
}
