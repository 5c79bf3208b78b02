//! Three-layer onset -> interval -> PLL tempo tracker.
//!
//! Built on onset-timing rather than FFT autocorrelation so it can run
//! every hop with a tiny, fixed memory footprint.

pub mod interval;
pub mod onset;
pub mod pll;

use interval::IntervalEstimator;
use onset::OnsetDetector;
use pll::{Pll, TempoOutput};

pub use pll::LockState;

const IOI_MIN_SECONDS: f32 = 60.0 / 300.0 * 0.5;

pub struct TempoTracker {
    onset: OnsetDetector,
    interval: IntervalEstimator,
    pll: Pll,
    sample_rate_hz: f32,
    hops_since_last_onset: u64,
    last_onset_hop: Option<u64>,
    hop_counter: u64,
}

impl TempoTracker {
    pub fn new(
        sample_rate_hz: f32,
        bpm_min: f32,
        bpm_max: f32,
        bpm_tau: f32,
        confidence_tau: f32,
        phase_correction_gain: f32,
        bar_correction_gain: f32,
        beats_per_bar: u8,
        refractory_hops: u32,
    ) -> Self {
        Self {
            onset: OnsetDetector::new(refractory_hops),
            interval: IntervalEstimator::new(bpm_min, bpm_max, bpm_tau),
            pll: Pll::new(sample_rate_hz, confidence_tau, phase_correction_gain, bar_correction_gain, beats_per_bar),
            sample_rate_hz,
            hops_since_last_onset: 0,
            last_onset_hop: None,
            hop_counter: 0,
        }
    }

    pub fn set_contract(
        &mut self,
        bpm_min: f32,
        bpm_max: f32,
        bpm_tau: f32,
        confidence_tau: f32,
        phase_correction_gain: f32,
        bar_correction_gain: f32,
        beats_per_bar: u8,
    ) {
        self.interval.set_bpm_range(bpm_min, bpm_max, bpm_tau);
        self.pll.set_params(confidence_tau, phase_correction_gain, bar_correction_gain, beats_per_bar);
    }

    pub fn reset(&mut self) {
        self.onset.reset();
        self.interval.reset();
        self.pll.reset();
        self.hops_since_last_onset = 0;
        self.last_onset_hop = None;
        self.hop_counter = 0;
    }

    /// Advances all three layers by one hop and returns the published
    /// tempo state.
    pub fn process(&mut self, flux: f32, rms: f32) -> TempoOutput {
        let onset = self.onset.process(flux, rms);

        let mut consistency = 0.0;
        let mut bpm_candidate = 0.0;

        if onset {
            if let Some(last_hop) = self.last_onset_hop {
                let ioi_hops = self.hop_counter - last_hop;
                let ioi_seconds = ioi_hops as f32 * (crate::time::HOP_SIZE as f32 / self.sample_rate_hz);
                if ioi_seconds >= IOI_MIN_SECONDS {
                    self.interval.push_ioi(ioi_seconds);
                }
            }
            self.last_onset_hop = Some(self.hop_counter);

            let estimate = self.interval.estimate();
            consistency = estimate.consistency;
            bpm_candidate = estimate.bpm_candidate;
        }

        let out = self.pll.advance(onset, bpm_candidate, consistency);
        self.hop_counter += 1;
        out
    }

    pub fn state(&self) -> LockState {
        self.pll.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::HOP_SIZE;

    fn hops_per_beat(bpm: f32, sample_rate_hz: f32) -> u32 {
        (sample_rate_hz * 60.0 / bpm / HOP_SIZE as f32).round() as u32
    }

    #[test]
    fn click_train_120bpm_locks_within_a_few_seconds() {
        let mut tracker = TempoTracker::new(16_000.0, 30.0, 300.0, 0.5, 1.0, 0.35, 0.2, 4, 13);
        let hpb = hops_per_beat(120.0, 16_000.0);
        let total_hops = (16_000.0 * 15.0 / HOP_SIZE as f32) as u32; // 15s
        let mut locked = false;
        for h in 0..total_hops {
            let on_click = h % hpb == 0;
            let flux = if on_click { 0.9 } else { 0.02 };
            let rms = if on_click { 0.5 } else { 0.02 };
            let out = tracker.process(flux, rms);
            if out.locked {
                locked = true;
            }
        }
        assert!(locked, "tracker failed to reach Locked state");
    }
}
