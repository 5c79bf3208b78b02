//! `TuningContract`: tempo-tracker and freshness parameters, validated and
//! clamped independently from `TuningPipeline`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningContract {
    pub bpm_min: f32,
    pub bpm_max: f32,
    pub bpm_tau: f32,
    pub confidence_tau: f32,
    pub phase_correction_gain: f32,
    pub bar_correction_gain: f32,
    pub beats_per_bar: u8,
    pub beat_unit: u8,
    pub audio_staleness_ms: f32,
}

impl Default for TuningContract {
    fn default() -> Self {
        Self {
            bpm_min: 30.0,
            bpm_max: 300.0,
            bpm_tau: 0.50,
            confidence_tau: 1.00,
            phase_correction_gain: 0.35,
            bar_correction_gain: 0.20,
            beats_per_bar: 4,
            beat_unit: 4,
            audio_staleness_ms: 100.0,
        }
    }
}

/// Validates and clamps every field in place. `bpm_max` is forced at least
/// one BPM above `bpm_min` so the tempo search range is never empty.
pub fn clamp(mut c: TuningContract) -> TuningContract {
    c.bpm_min = c.bpm_min.clamp(20.0, 200.0);
    c.bpm_max = c.bpm_max.clamp(c.bpm_min + 1.0, 400.0);
    c.bpm_tau = c.bpm_tau.clamp(0.01, 10.0);
    c.confidence_tau = c.confidence_tau.clamp(0.01, 10.0);
    c.phase_correction_gain = c.phase_correction_gain.clamp(0.0, 1.0);
    c.bar_correction_gain = c.bar_correction_gain.clamp(0.0, 1.0);
    c.beats_per_bar = c.beats_per_bar.clamp(1, 12);
    c.beat_unit = c.beat_unit.clamp(1, 16);
    c.audio_staleness_ms = c.audio_staleness_ms.clamp(1.0, 10_000.0);
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_is_already_clamped() {
        let c = TuningContract::default();
        assert_eq!(clamp(c), c);
    }

    #[test]
    fn bpm_max_stays_above_bpm_min() {
        let mut c = TuningContract::default();
        c.bpm_min = 150.0;
        c.bpm_max = 100.0;
        let clamped = clamp(c);
        assert!(clamped.bpm_max > clamped.bpm_min);
    }

    #[test]
    fn beats_per_bar_cannot_be_zero() {
        let mut c = TuningContract::default();
        c.beats_per_bar = 0;
        assert_eq!(clamp(c).beats_per_bar, 1);
    }

    #[test]
    fn beat_unit_is_capped() {
        let mut c = TuningContract::default();
        c.beat_unit = 255;
        assert_eq!(clamp(c).beat_unit, 16);
    }
}
