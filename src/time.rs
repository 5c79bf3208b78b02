//! Sample-accurate timebase shared by every DSP stage.

use serde::{Deserialize, Serialize};

/// Samples per hop. Fixed by the canonical 16 kHz / 16 ms grid.
pub const HOP_SIZE: usize = 256;

/// Canonical sample rate in Hz.
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Monotonic timestamp attached to every published frame.
///
/// `sample_index` is the authoritative clock: it increments by `HOP_SIZE`
/// on every successful capture and never resets except at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioTime {
    pub sample_index: u64,
    pub sample_rate_hz: u32,
}

impl AudioTime {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_index: 0,
            sample_rate_hz,
        }
    }

    pub fn advance(&mut self, hop_size: usize) {
        self.sample_index = self.sample_index.wrapping_add(hop_size as u64);
    }

    pub fn seconds(&self) -> f64 {
        self.sample_index as f64 / self.sample_rate_hz as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_increments_by_hop_size() {
        let mut t = AudioTime::new(SAMPLE_RATE_HZ);
        t.advance(HOP_SIZE);
        assert_eq!(t.sample_index, HOP_SIZE as u64);
        t.advance(HOP_SIZE);
        assert_eq!(t.sample_index, 2 * HOP_SIZE as u64);
    }

    #[test]
    fn seconds_matches_sample_rate() {
        let mut t = AudioTime::new(16_000);
        t.advance(16_000);
        assert!((t.seconds() - 1.0).abs() < 1e-9);
    }
}
