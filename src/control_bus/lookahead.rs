//! 3-frame lookahead despike: replaces an isolated direction-change spike
//! with the average of its neighbors, at a fixed 2-frame publish delay.
//!
//! The spike test itself only ever looks at a frame's two immediate
//! neighbors (a 3-frame window), but the corrected value is held one extra
//! hop in `pending_output` before it's handed back, so the total delay from
//! "pushed" to "returned" is two hops (~32 ms), matching the 2-frame
//! publish delay.

pub const LOOKAHEAD_FRAMES: usize = 3;
const SPIKE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpikeDetectionStats {
    pub total_frames: u64,
    pub spikes_detected: u64,
    pub spikes_corrected: u64,
    pub total_energy_removed: f32,
}

impl SpikeDetectionStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn merge(&mut self, other: &SpikeDetectionStats) {
        self.total_frames = self.total_frames.max(other.total_frames);
        self.spikes_detected += other.spikes_detected;
        self.spikes_corrected += other.spikes_corrected;
        self.total_energy_removed += other.total_energy_removed;
    }
}

/// Generic over the vector width (8 bands or 12 chroma).
pub struct LookaheadDespike<const N: usize> {
    history: [[f32; N]; LOOKAHEAD_FRAMES],
    frames_filled: usize,
    enabled: bool,
    /// Despiked result from the previous `push` call, returned on this call
    /// so the total publish delay is two hops rather than one.
    pending_output: [f32; N],
    has_pending: bool,
    stats: SpikeDetectionStats,
}

impl<const N: usize> LookaheadDespike<N> {
    pub fn new() -> Self {
        Self {
            history: [[0.0; N]; LOOKAHEAD_FRAMES],
            frames_filled: 0,
            enabled: true,
            pending_output: [0.0; N],
            has_pending: false,
            stats: SpikeDetectionStats::default(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn reset(&mut self) {
        self.history = [[0.0; N]; LOOKAHEAD_FRAMES];
        self.frames_filled = 0;
        self.pending_output = [0.0; N];
        self.has_pending = false;
        self.stats.reset();
    }

    pub fn stats(&self) -> SpikeDetectionStats {
        self.stats
    }

    /// Pushes a new frame and returns the despiked, 2-hop-delayed output.
    /// Until the pipeline has filled, the input passes through unmodified.
    pub fn push(&mut self, frame: [f32; N]) -> [f32; N] {
        self.history.rotate_left(1);
        self.history[LOOKAHEAD_FRAMES - 1] = frame;
        if self.frames_filled < LOOKAHEAD_FRAMES {
            self.frames_filled += 1;
        }
        self.stats.total_frames += 1;

        if !self.enabled {
            return frame;
        }
        if self.frames_filled < LOOKAHEAD_FRAMES {
            return frame;
        }

        let prev = self.history[0];
        let mid = self.history[1];
        let next = self.history[2];

        let mut despiked = mid;
        for i in 0..N {
            let is_spike = mid[i] - prev[i] > SPIKE_THRESHOLD && mid[i] - next[i] > SPIKE_THRESHOLD;
            if is_spike {
                let replacement = (prev[i] + next[i]) * 0.5;
                self.stats.spikes_detected += 1;
                self.stats.spikes_corrected += 1;
                self.stats.total_energy_removed += mid[i] - replacement;
                despiked[i] = replacement;
            }
        }

        // Hold this hop's despiked result one extra hop so the value handed
        // back lags the newest push by two hops, not one.
        let out = if self.has_pending { self.pending_output } else { despiked };
        self.pending_output = despiked;
        self.has_pending = true;
        out
    }
}

impl<const N: usize> Default for LookaheadDespike<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_isolated_spike_with_neighbor_average() {
        let mut d: LookaheadDespike<8> = LookaheadDespike::new();
        let low = [0.1; 8];
        let mut spike = [0.1; 8];
        spike[2] = 0.9;

        d.push(low);
        d.push(spike);
        d.push(low);
        let out = d.push(low);

        assert!((out[2] - 0.1).abs() < 1e-6);
        assert_eq!(d.stats().spikes_corrected, 1);
    }

    #[test]
    fn output_lags_input_by_two_hops() {
        let mut d: LookaheadDespike<8> = LookaheadDespike::new();
        // Each frame is a distinct constant value so the hop it came from
        // is identifiable in the output.
        for hop in 0..6 {
            let out = d.push([hop as f32; 8]);
            if hop >= 4 {
                // By the time hop 4 is pushed, the output should reflect
                // hop 2 (a two-hop lag), not hop 3 or hop 4.
                assert!((out[0] - (hop as f32 - 2.0)).abs() < 1e-6, "hop {hop} returned {out:?}");
            }
        }
    }

    #[test]
    fn sustained_rise_is_not_treated_as_a_spike() {
        let mut d: LookaheadDespike<8> = LookaheadDespike::new();
        d.push([0.1; 8]);
        d.push([0.5; 8]);
        d.push([0.9; 8]);
        let out = d.push([0.9; 8]);
        assert!(out[0] > 0.3);
    }
}
