//! Named starting points for `TuningPipeline`, derived from comparative
//! analysis of different ambient-noise-reactive lighting pipelines. Each
//! preset only overrides the fields its philosophy cares about; everything
//! else falls through to `TuningPipeline::default()` and the shared clamp.

use super::pipeline::{clamp, TuningPipeline};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AudioPreset {
    /// Balanced 4:1 AGC ratio; good all-around, may pump slightly in gaps.
    Default = 0,
    /// 50:1 AGC ratio, fast attack / very slow release.
    SensoryBridge = 1,
    /// Maximum compression, fastest response; consistent-level sources.
    AggressiveAgc = 2,
    /// Minimal compression, smooth response; wide-dynamics sources.
    Conservative = 3,
    /// Slow release plus per-band gain/noise-floor shaping for diffuser
    /// viewing rather than direct pixel viewing.
    LgpSmooth = 4,
}

pub fn preset_name(preset: AudioPreset) -> &'static str {
    match preset {
        AudioPreset::Default => "Default",
        AudioPreset::SensoryBridge => "Sensory Bridge",
        AudioPreset::AggressiveAgc => "Aggressive AGC",
        AudioPreset::Conservative => "Conservative",
        AudioPreset::LgpSmooth => "LGP Smooth",
    }
}

pub fn get_preset(preset: AudioPreset) -> TuningPipeline {
    let mut t = TuningPipeline::default();

    match preset {
        AudioPreset::Default => {
            t.agc_attack = 0.08;
            t.agc_release = 0.02;
            t.control_bus_alpha_fast = 0.35;
            t.control_bus_alpha_slow = 0.12;
            t.silence_hysteresis_ms = 10_000.0;
        }
        AudioPreset::SensoryBridge => {
            t.agc_attack = 0.25;
            t.agc_release = 0.005;
            t.control_bus_alpha_fast = 0.45;
            t.control_bus_alpha_slow = 0.225;
            t.silence_hysteresis_ms = 10_000.0;
            t.silence_threshold = 0.005;
            t.noise_floor_min = 0.0006;
        }
        AudioPreset::AggressiveAgc => {
            t.agc_attack = 0.35;
            t.agc_release = 0.001;
            t.agc_max_gain = 200.0;
            t.control_bus_alpha_fast = 0.5;
            t.control_bus_alpha_slow = 0.3;
            t.silence_hysteresis_ms = 5_000.0;
        }
        AudioPreset::Conservative => {
            t.agc_attack = 0.03;
            t.agc_release = 0.05;
            t.agc_max_gain = 50.0;
            t.control_bus_alpha_fast = 0.25;
            t.control_bus_alpha_slow = 0.08;
            t.silence_hysteresis_ms = 15_000.0;
            t.silence_threshold = 0.02;
        }
        AudioPreset::LgpSmooth => {
            t.agc_attack = 0.06;
            t.agc_release = 0.015;
            t.control_bus_alpha_fast = 0.20;
            t.control_bus_alpha_slow = 0.06;
            t.band_attack = 0.12;
            t.band_release = 0.025;
            t.heavy_band_attack = 0.06;
            t.heavy_band_release = 0.012;
            t.per_band_gains = [0.8, 0.85, 1.0, 1.2, 1.5, 1.8, 2.0, 2.2];
            t.per_band_noise_floors =
                [0.0008, 0.0012, 0.0006, 0.0005, 0.0008, 0.0010, 0.0012, 0.0006];
            t.use_per_band_noise_floor = true;
            t.silence_hysteresis_ms = 8_000.0;
        }
    }

    clamp(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_is_already_clamped() {
        for preset in [
            AudioPreset::Default,
            AudioPreset::SensoryBridge,
            AudioPreset::AggressiveAgc,
            AudioPreset::Conservative,
            AudioPreset::LgpSmooth,
        ] {
            let t = get_preset(preset);
            assert_eq!(clamp(t), t, "{} was not idempotent under clamp", preset_name(preset));
        }
    }

    #[test]
    fn lgp_smooth_enables_per_band_noise_floor() {
        let t = get_preset(AudioPreset::LgpSmooth);
        assert!(t.use_per_band_noise_floor);
    }

    #[test]
    fn aggressive_agc_has_highest_max_gain() {
        let aggressive = get_preset(AudioPreset::AggressiveAgc);
        let default = get_preset(AudioPreset::Default);
        assert!(aggressive.agc_max_gain > default.agc_max_gain);
    }

    #[test]
    fn preset_names_are_stable() {
        assert_eq!(preset_name(AudioPreset::SensoryBridge), "Sensory Bridge");
        assert_eq!(preset_name(AudioPreset::LgpSmooth), "LGP Smooth");
    }
}
