//! Hysteresis-based silence gating: `silent_scale` fades from 1 to 0 over
//! `silence_hysteresis_ms` once RMS stays below threshold, and snaps back
//! to 1 within 2 hops on any activity.

use crate::time::HOP_SIZE;

const HOP_MS: f32 = HOP_SIZE as f32 / 16_000.0 * 1000.0;
const FADE_DURATION_MS: f32 = 1000.0;

pub struct SilenceGate {
    below_threshold_ms: f32,
    silent_scale: f32,
}

impl SilenceGate {
    pub fn new() -> Self {
        Self {
            below_threshold_ms: 0.0,
            silent_scale: 1.0,
        }
    }

    pub fn reset(&mut self) {
        self.below_threshold_ms = 0.0;
        self.silent_scale = 1.0;
    }

    pub fn update(&mut self, rms: f32, threshold: f32, hysteresis_ms: f32) -> f32 {
        if rms < threshold {
            self.below_threshold_ms += HOP_MS;
        } else {
            self.below_threshold_ms = 0.0;
            self.silent_scale = 1.0;
            return self.silent_scale;
        }

        if self.below_threshold_ms >= hysteresis_ms {
            let fade_progress_ms = self.below_threshold_ms - hysteresis_ms;
            self.silent_scale = (1.0 - fade_progress_ms / FADE_DURATION_MS).clamp(0.0, 1.0);
        }

        self.silent_scale
    }
}

impl Default for SilenceGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hops_for_ms(ms: f32) -> u32 {
        (ms / HOP_MS).ceil() as u32
    }

    #[test]
    fn fades_to_zero_after_hysteresis_then_fade_duration() {
        let mut gate = SilenceGate::new();
        let hysteresis_ms = 100.0;
        for _ in 0..hops_for_ms(hysteresis_ms + FADE_DURATION_MS + HOP_MS) {
            gate.update(0.0, 0.01, hysteresis_ms);
        }
        assert!(gate.silent_scale < 0.01);
    }

    #[test]
    fn single_loud_hop_restores_scale_instantly() {
        let mut gate = SilenceGate::new();
        for _ in 0..hops_for_ms(5000.0) {
            gate.update(0.0, 0.01, 100.0);
        }
        assert!(gate.silent_scale < 1.0);
        let restored = gate.update(0.5, 0.01, 100.0);
        assert_eq!(restored, 1.0);
    }
}
