//! Layer (c): phase-locked beat tracking and the Searching/Tracking/Locked
//! state machine.

use crate::time::HOP_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Searching,
    Tracking,
    Locked,
}

pub struct Pll {
    phase01: f32,
    bpm: f32,
    confidence: f32,
    confidence_tau: f32,
    phase_correction_gain: f32,
    bar_correction_gain: f32,
    beats_per_bar: u8,
    beat_in_bar: u8,
    state: LockState,
    consistent_onset_streak: u32,
    hops_since_onset: u32,
    seconds_above_tracking_threshold: f32,
    phase_error_history: Vec<f32>,
    beat_strength: f32,
    sample_rate_hz: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TempoOutput {
    pub bpm: f32,
    pub phase01: f32,
    pub confidence: f32,
    pub locked: bool,
    pub beat_strength: f32,
    pub beat_tick: bool,
}

impl Pll {
    pub fn new(
        sample_rate_hz: f32,
        confidence_tau: f32,
        phase_correction_gain: f32,
        bar_correction_gain: f32,
        beats_per_bar: u8,
    ) -> Self {
        Self {
            phase01: 0.0,
            bpm: 120.0,
            confidence: 0.0,
            confidence_tau,
            phase_correction_gain,
            bar_correction_gain,
            beats_per_bar,
            beat_in_bar: 0,
            state: LockState::Searching,
            consistent_onset_streak: 0,
            hops_since_onset: u32::MAX / 2,
            seconds_above_tracking_threshold: 0.0,
            phase_error_history: Vec::with_capacity(8),
            beat_strength: 0.0,
            sample_rate_hz,
        }
    }

    pub fn set_params(&mut self, confidence_tau: f32, phase_correction_gain: f32, bar_correction_gain: f32, beats_per_bar: u8) {
        self.confidence_tau = confidence_tau;
        self.phase_correction_gain = phase_correction_gain;
        self.bar_correction_gain = bar_correction_gain;
        self.beats_per_bar = beats_per_bar.max(1);
    }

    pub fn reset(&mut self) {
        self.phase01 = 0.0;
        self.confidence = 0.0;
        self.state = LockState::Searching;
        self.consistent_onset_streak = 0;
        self.hops_since_onset = u32::MAX / 2;
        self.seconds_above_tracking_threshold = 0.0;
        self.phase_error_history.clear();
        self.beat_strength = 0.0;
    }

    /// Advances the PLL by one hop. `onset` and `consistency`/`bpm_candidate`
    /// come from the onset detector and interval estimator respectively.
    pub fn advance(&mut self, onset: bool, bpm_candidate: f32, consistency: f32) -> TempoOutput {
        self.hops_since_onset = self.hops_since_onset.saturating_add(1);

        if bpm_candidate > 0.0 {
            self.bpm = bpm_candidate;
        }
        let period_samples = self.sample_rate_hz * 60.0 / self.bpm.max(1.0);
        let delta_phi = HOP_SIZE as f32 / period_samples;

        let prev_phase = self.phase01;
        self.phase01 += delta_phi;

        let mut beat_tick = false;
        if self.phase01 >= 1.0 {
            self.phase01 -= 1.0;
            beat_tick = self.state == LockState::Locked;
            self.beat_in_bar = (self.beat_in_bar + 1) % self.beats_per_bar.max(1);
        }
        let _ = prev_phase;

        self.beat_strength *= 0.92;

        if onset {
            self.hops_since_onset = 0;
            let error = wrap_phase_error(self.phase01 - 0.0);
            self.phase01 -= self.phase_correction_gain * error;
            self.phase01 = self.phase01.rem_euclid(1.0);

            if self.beat_in_bar == 0 {
                self.phase01 -= self.bar_correction_gain * error;
                self.phase01 = self.phase01.rem_euclid(1.0);
            }

            self.push_phase_error(error);
            self.beat_strength = 1.0;

            if consistency >= 0.5 {
                self.consistent_onset_streak += 1;
            } else {
                self.consistent_onset_streak = 0;
            }

            if consistency >= 0.7 {
                self.seconds_above_tracking_threshold += period_samples / self.sample_rate_hz;
            } else {
                self.seconds_above_tracking_threshold = 0.0;
            }
        } else if consistency < 0.3 {
            self.consistent_onset_streak = 0;
        }

        self.confidence = lerp(self.confidence, consistency, 1.0 / (self.confidence_tau * 62.5).max(1.0));

        self.advance_state(consistency);

        TempoOutput {
            bpm: self.bpm,
            phase01: self.phase01,
            confidence: self.confidence,
            locked: self.state == LockState::Locked,
            beat_strength: self.beat_strength,
            beat_tick,
        }
    }

    fn advance_state(&mut self, consistency: f32) {
        let seconds_since_onset = self.hops_since_onset as f32 * (HOP_SIZE as f32 / self.sample_rate_hz);

        match self.state {
            LockState::Searching => {
                if self.consistent_onset_streak >= 4 {
                    self.state = LockState::Tracking;
                }
            }
            LockState::Tracking => {
                let variance = phase_error_variance(&self.phase_error_history);
                if self.seconds_above_tracking_threshold >= 2.0 && variance < 0.04 {
                    self.state = LockState::Locked;
                }
            }
            LockState::Locked => {}
        }

        if seconds_since_onset > 3.0 || (consistency < 0.3 && seconds_since_onset > 1.0) {
            self.state = LockState::Searching;
            self.consistent_onset_streak = 0;
            self.seconds_above_tracking_threshold = 0.0;
        }
    }

    fn push_phase_error(&mut self, error: f32) {
        if self.phase_error_history.len() == 8 {
            self.phase_error_history.remove(0);
        }
        self.phase_error_history.push(error);
    }

    pub fn state(&self) -> LockState {
        self.state
    }
}

fn wrap_phase_error(mut e: f32) -> f32 {
    while e > 0.5 {
        e -= 1.0;
    }
    while e < -0.5 {
        e += 1.0;
    }
    e
}

fn phase_error_variance(history: &[f32]) -> f32 {
    if history.is_empty() {
        return 1.0;
    }
    let mean = history.iter().sum::<f32>() / history.len() as f32;
    history.iter().map(|e| (e - mean) * (e - mean)).sum::<f32>() / history.len() as f32
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_searching() {
        let pll = Pll::new(16_000.0, 1.0, 0.35, 0.2, 4);
        assert_eq!(pll.state(), LockState::Searching);
    }

    #[test]
    fn sustained_consistent_onsets_reach_tracking() {
        let mut pll = Pll::new(16_000.0, 1.0, 0.35, 0.2, 4);
        let hops_per_beat = (16_000.0 * 60.0 / 120.0 / HOP_SIZE as f32) as u32;
        for beat in 0..6 {
            for hop in 0..hops_per_beat {
                let onset = hop == 0 && beat > 0;
                pll.advance(onset, 120.0, 0.8);
            }
        }
        assert_ne!(pll.state(), LockState::Searching);
    }

    #[test]
    fn beat_tick_only_true_once_per_cycle_when_locked() {
        let mut pll = Pll::new(16_000.0, 1.0, 0.35, 0.2, 4);
        pll.state = LockState::Locked;
        let mut ticks = 0;
        for _ in 0..200 {
            let out = pll.advance(false, 120.0, 0.9);
            if out.beat_tick {
                ticks += 1;
            }
        }
        assert!(ticks >= 1);
    }
}
