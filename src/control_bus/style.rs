//! Coarse style classifier: a rule-based scorer over the four saliency
//! scalars and mean band energy.
//!
//! Thresholds are chosen to keep outputs within their invariant bounds and
//! to separate the five classes on the obvious extremes (quiet/diffuse,
//! beat-driven, pitched, percussive-transient).

use super::saliency::MusicalSaliency;
use super::NUM_BANDS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MusicStyle {
    Unknown = 0,
    Ambient = 1,
    Rhythmic = 2,
    Tonal = 3,
    Percussive = 4,
}

pub fn classify_style(saliency: &MusicalSaliency, bands: &[f32; NUM_BANDS]) -> (MusicStyle, f32) {
    let mean_band: f32 = bands.iter().sum::<f32>() / NUM_BANDS as f32;

    if mean_band < 0.05 {
        return (MusicStyle::Ambient, 1.0 - mean_band * 10.0);
    }

    if saliency.dynamic_novelty > 0.6 && saliency.rhythmic < 0.4 {
        return (MusicStyle::Percussive, saliency.dynamic_novelty);
    }

    if saliency.rhythmic > 0.5 {
        return (MusicStyle::Rhythmic, saliency.rhythmic);
    }

    if saliency.harmonic > 0.5 {
        return (MusicStyle::Tonal, saliency.harmonic);
    }

    (MusicStyle::Unknown, 0.25)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_signal_is_ambient() {
        let saliency = MusicalSaliency::default();
        let bands = [0.0; NUM_BANDS];
        let (style, confidence) = classify_style(&saliency, &bands);
        assert_eq!(style, MusicStyle::Ambient);
        assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn strong_rhythmic_saliency_classifies_rhythmic() {
        let saliency = MusicalSaliency {
            harmonic: 0.2,
            rhythmic: 0.9,
            timbral: 0.3,
            dynamic_novelty: 0.2,
        };
        let bands = [0.5; NUM_BANDS];
        let (style, _) = classify_style(&saliency, &bands);
        assert_eq!(style, MusicStyle::Rhythmic);
    }

    #[test]
    fn strong_harmonic_saliency_classifies_tonal() {
        let saliency = MusicalSaliency {
            harmonic: 0.9,
            rhythmic: 0.1,
            timbral: 0.3,
            dynamic_novelty: 0.1,
        };
        let bands = [0.5; NUM_BANDS];
        let (style, _) = classify_style(&saliency, &bands);
        assert_eq!(style, MusicStyle::Tonal);
    }
}
