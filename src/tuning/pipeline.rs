//! `TuningPipeline`: validated, clamped DSP parameters mutable from
//! RenderTask via a seqlock (see `tuning::seqlock`).

use serde::{Deserialize, Serialize};

pub const NUM_BANDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningPipeline {
    pub dc_alpha: f32,

    pub agc_target_rms: f32,
    pub agc_min_gain: f32,
    pub agc_max_gain: f32,
    pub agc_attack: f32,
    pub agc_release: f32,
    pub agc_clip_reduce: f32,
    pub agc_idle_return_rate: f32,

    pub noise_floor_min: f32,
    pub noise_floor_rise: f32,
    pub noise_floor_fall: f32,
    pub per_band_noise_floors: [f32; NUM_BANDS],
    pub use_per_band_noise_floor: bool,

    pub gate_start_factor: f32,
    pub gate_range_factor: f32,
    pub gate_range_min: f32,

    pub rms_db_floor: f32,
    pub rms_db_ceil: f32,
    pub band_db_floor: f32,
    pub band_db_ceil: f32,
    pub chroma_db_floor: f32,
    pub chroma_db_ceil: f32,
    pub flux_scale: f32,

    pub control_bus_alpha_fast: f32,
    pub control_bus_alpha_slow: f32,
    pub band_attack: f32,
    pub band_release: f32,
    pub heavy_band_attack: f32,
    pub heavy_band_release: f32,

    pub per_band_gains: [f32; NUM_BANDS],

    pub silence_hysteresis_ms: f32,
    pub silence_threshold: f32,

    pub novelty_use_spectral_flux: bool,
    pub novelty_spectral_flux_scale: f32,

    pub bins64_adaptive_scale: f32,
    pub bins64_adaptive_floor: f32,
    pub bins64_adaptive_rise: f32,
    pub bins64_adaptive_fall: f32,
    pub bins64_adaptive_decay: f32,
}

impl Default for TuningPipeline {
    fn default() -> Self {
        Self {
            dc_alpha: crate::dsp::dc_blocker::DEFAULT_DC_ALPHA,
            agc_target_rms: 0.25,
            agc_min_gain: 1.0,
            agc_max_gain: 40.0,
            agc_attack: 0.03,
            agc_release: 0.015,
            agc_clip_reduce: 0.90,
            agc_idle_return_rate: 0.01,
            noise_floor_min: 0.0004,
            noise_floor_rise: 0.0005,
            noise_floor_fall: 0.01,
            per_band_noise_floors: [0.0008, 0.0012, 0.0006, 0.0005, 0.0008, 0.0010, 0.0012, 0.0006],
            use_per_band_noise_floor: false,
            gate_start_factor: 1.0,
            gate_range_factor: 1.5,
            gate_range_min: 0.0005,
            rms_db_floor: -65.0,
            rms_db_ceil: -12.0,
            band_db_floor: -65.0,
            band_db_ceil: -12.0,
            chroma_db_floor: -65.0,
            chroma_db_ceil: -12.0,
            flux_scale: 1.0,
            control_bus_alpha_fast: 0.35,
            control_bus_alpha_slow: 0.12,
            band_attack: 0.15,
            band_release: 0.03,
            heavy_band_attack: 0.08,
            heavy_band_release: 0.015,
            per_band_gains: [0.8, 0.85, 1.0, 1.2, 1.5, 1.8, 2.0, 2.2],
            silence_hysteresis_ms: 5000.0,
            silence_threshold: 0.01,
            novelty_use_spectral_flux: true,
            novelty_spectral_flux_scale: 1.0,
            bins64_adaptive_scale: 200.0,
            bins64_adaptive_floor: 4.0,
            bins64_adaptive_rise: 0.0050,
            bins64_adaptive_fall: 0.0025,
            bins64_adaptive_decay: 0.995,
        }
    }
}

/// Validates and clamps every field in place. Out-of-range writer values
/// are silently clamped rather than rejected -- the clamp is the contract,
/// and configuration changes never surface as errors.
pub fn clamp(mut t: TuningPipeline) -> TuningPipeline {
    t.dc_alpha = t.dc_alpha.clamp(
        crate::dsp::dc_blocker::DC_ALPHA_MIN,
        crate::dsp::dc_blocker::DC_ALPHA_MAX,
    );

    t.agc_min_gain = t.agc_min_gain.clamp(0.1, 50.0);
    t.agc_max_gain = t.agc_max_gain.clamp(1.0, 500.0).max(t.agc_min_gain);
    t.agc_target_rms = t.agc_target_rms.clamp(0.01, 1.0);
    t.agc_attack = t.agc_attack.clamp(0.001, 1.0);
    t.agc_release = t.agc_release.clamp(0.001, 1.0);
    t.agc_clip_reduce = t.agc_clip_reduce.clamp(0.1, 1.0);
    t.agc_idle_return_rate = t.agc_idle_return_rate.clamp(0.0, 1.0);

    t.noise_floor_min = t.noise_floor_min.clamp(0.0, 0.1);
    t.noise_floor_rise = t.noise_floor_rise.clamp(0.0, 1.0);
    t.noise_floor_fall = t.noise_floor_fall.clamp(0.0, 1.0);
    for f in t.per_band_noise_floors.iter_mut() {
        *f = f.clamp(0.0, 0.1);
    }

    t.gate_start_factor = t.gate_start_factor.clamp(0.0, 10.0);
    t.gate_range_factor = t.gate_range_factor.clamp(0.1, 10.0);
    t.gate_range_min = t.gate_range_min.clamp(0.0, 0.1);

    t.rms_db_floor = t.rms_db_floor.clamp(-120.0, 0.0);
    t.rms_db_ceil = t.rms_db_ceil.clamp(-120.0, 0.0).max(t.rms_db_floor + 1.0);
    t.band_db_floor = t.band_db_floor.clamp(-120.0, 0.0);
    t.band_db_ceil = t.band_db_ceil.clamp(-120.0, 0.0).max(t.band_db_floor + 1.0);
    t.chroma_db_floor = t.chroma_db_floor.clamp(-120.0, 0.0);
    t.chroma_db_ceil = t.chroma_db_ceil.clamp(-120.0, 0.0).max(t.chroma_db_floor + 1.0);
    t.flux_scale = t.flux_scale.clamp(0.0, 10.0);

    t.control_bus_alpha_fast = t.control_bus_alpha_fast.clamp(0.01, 1.0);
    t.control_bus_alpha_slow = t.control_bus_alpha_slow.clamp(0.001, 1.0);
    t.band_attack = t.band_attack.clamp(0.001, 1.0);
    t.band_release = t.band_release.clamp(0.001, 1.0);
    t.heavy_band_attack = t.heavy_band_attack.clamp(0.001, 1.0);
    t.heavy_band_release = t.heavy_band_release.clamp(0.001, 1.0);

    for g in t.per_band_gains.iter_mut() {
        *g = g.clamp(0.0, 10.0);
    }

    t.silence_hysteresis_ms = t.silence_hysteresis_ms.clamp(0.0, 60_000.0);
    t.silence_threshold = t.silence_threshold.clamp(0.0, 1.0);

    t.novelty_spectral_flux_scale = t.novelty_spectral_flux_scale.clamp(0.0, 10.0);

    t.bins64_adaptive_scale = t.bins64_adaptive_scale.clamp(1.0, 10_000.0);
    t.bins64_adaptive_floor = t.bins64_adaptive_floor.clamp(0.001, 1000.0);
    t.bins64_adaptive_rise = t.bins64_adaptive_rise.clamp(0.0, 1.0);
    t.bins64_adaptive_fall = t.bins64_adaptive_fall.clamp(0.0, 1.0);
    t.bins64_adaptive_decay = t.bins64_adaptive_decay.clamp(0.0, 1.0);

    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning_is_already_clamped() {
        let t = TuningPipeline::default();
        assert_eq!(clamp(t), t);
    }

    #[test]
    fn max_gain_cannot_fall_below_min_gain() {
        let mut t = TuningPipeline::default();
        t.agc_min_gain = 10.0;
        t.agc_max_gain = 1.0;
        let c = clamp(t);
        assert!(c.agc_max_gain >= c.agc_min_gain);
    }

    #[test]
    fn db_ceil_must_exceed_floor() {
        let mut t = TuningPipeline::default();
        t.rms_db_floor = -10.0;
        t.rms_db_ceil = -20.0;
        let c = clamp(t);
        assert!(c.rms_db_ceil > c.rms_db_floor);
    }

    #[test]
    fn out_of_range_values_are_clamped_not_rejected() {
        let mut t = TuningPipeline::default();
        t.silence_threshold = 5.0;
        let c = clamp(t);
        assert_eq!(c.silence_threshold, 1.0);
    }
}
