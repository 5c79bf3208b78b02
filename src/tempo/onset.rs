//! Layer (a): per-hop onset detection from spectral-flux novelty and the
//! VU-derivative, with an adaptive threshold and refractory period.

/// ~200 ms at the canonical 16 ms hop rate.
pub const DEFAULT_REFRACTORY_HOPS: u32 = 13;
const THRESHOLD_TRACK_RATE: f32 = 0.02;
const THRESHOLD_MULTIPLIER: f32 = 1.5;
const MIN_ONSET_STRENGTH: f32 = 0.05;

pub struct OnsetDetector {
    threshold: f32,
    last_rms: f32,
    hops_since_onset: u32,
    refractory_hops: u32,
}

impl OnsetDetector {
    pub fn new(refractory_hops: u32) -> Self {
        Self {
            threshold: 0.0,
            last_rms: 0.0,
            hops_since_onset: u32::MAX / 2,
            refractory_hops,
        }
    }

    pub fn reset(&mut self) {
        self.threshold = 0.0;
        self.last_rms = 0.0;
        self.hops_since_onset = u32::MAX / 2;
    }

    /// `flux` is the novelty value from `dsp::NoveltyFlux`; `rms` is the
    /// current hop's smoothed RMS. Returns true exactly on hops declared
    /// onsets.
    pub fn process(&mut self, flux: f32, rms: f32) -> bool {
        let vu_derivative = (rms - self.last_rms).max(0.0);
        self.last_rms = rms;

        let combined = flux.max(vu_derivative);

        // `self.threshold` tracks the raw EMA; the comparison value applies
        // the multiplier on read so it never compounds across hops.
        self.threshold = lerp(self.threshold, combined, THRESHOLD_TRACK_RATE);
        let scaled_threshold = self.threshold * THRESHOLD_MULTIPLIER;

        self.hops_since_onset = self.hops_since_onset.saturating_add(1);

        let past_refractory = self.hops_since_onset > self.refractory_hops;
        let is_onset = combined > scaled_threshold
            && combined > MIN_ONSET_STRENGTH
            && past_refractory;

        if is_onset {
            self.hops_since_onset = 0;
        }
        is_onset
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_onsets_on_silence() {
        let mut det = OnsetDetector::new(DEFAULT_REFRACTORY_HOPS);
        let mut any = false;
        for _ in 0..100 {
            any |= det.process(0.0, 0.0);
        }
        assert!(!any);
    }

    #[test]
    fn detects_isolated_spike() {
        let mut det = OnsetDetector::new(DEFAULT_REFRACTORY_HOPS);
        for _ in 0..50 {
            det.process(0.01, 0.01);
        }
        let onset = det.process(0.8, 0.5);
        assert!(onset);
    }

    #[test]
    fn refractory_period_suppresses_double_trigger() {
        let mut det = OnsetDetector::new(DEFAULT_REFRACTORY_HOPS);
        for _ in 0..50 {
            det.process(0.01, 0.01);
        }
        assert!(det.process(0.8, 0.5));
        assert!(!det.process(0.8, 0.5));
    }
}
