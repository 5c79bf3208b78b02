//! Sliding-window Goertzel spectral analysis: 8 perceptual bands plus an
//! optional 64-bin log-spaced variant for sub-bass detail and tempo
//! novelty.

use crate::time::HOP_SIZE;

/// Size of the circular analysis window, in samples (2 hops).
pub const WINDOW_SIZE: usize = 512;

pub const NUM_BANDS: usize = 8;
pub const BAND_CENTER_HZ: [f32; NUM_BANDS] = [60.0, 120.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 7800.0];

pub const NUM_BINS_64: usize = 64;
const BIN64_LOW_HZ: f32 = 110.0;
const BIN64_HIGH_HZ: f32 = 4186.0;

struct GoertzelCoefficient {
    coeff: f32,
}

impl GoertzelCoefficient {
    fn new(target_freq: f32, sample_rate: f32, window_size: usize) -> Self {
        let k = (target_freq * window_size as f32 / sample_rate).round();
        let omega = 2.0 * std::f32::consts::PI * k / window_size as f32;
        Self { coeff: 2.0 * omega.cos() }
    }

    /// Runs the classic Goertzel recurrence over `buffer` and returns the
    /// magnitude.
    fn magnitude(&self, buffer: &[f32]) -> f32 {
        let mut s1 = 0.0f32;
        let mut s2 = 0.0f32;
        for &x in buffer {
            let s0 = x + self.coeff * s1 - s2;
            s2 = s1;
            s1 = s0;
        }
        (s1 * s1 + s2 * s2 - self.coeff * s1 * s2).max(0.0).sqrt()
    }
}

/// 8-band perceptual analyzer over a 512-sample sliding window, refreshed
/// twice per window (once per hop).
pub struct GoertzelAnalyzer {
    window: [f32; WINDOW_SIZE],
    write_idx: usize,
    hops_since_analysis: u32,
    coeffs: [GoertzelCoefficient; NUM_BANDS],
    norm: [f32; NUM_BANDS],
    gains: [f32; NUM_BANDS],
    last_output: [f32; NUM_BANDS],
}

impl GoertzelAnalyzer {
    pub fn new(sample_rate_hz: f32, per_band_gains: [f32; NUM_BANDS]) -> Self {
        let coeffs = std::array::from_fn(|i| {
            GoertzelCoefficient::new(BAND_CENTER_HZ[i], sample_rate_hz, WINDOW_SIZE)
        });
        Self {
            window: [0.0; WINDOW_SIZE],
            write_idx: 0,
            hops_since_analysis: 0,
            coeffs,
            // A flat-window Goertzel has gain ~ WINDOW_SIZE/2 at the
            // coefficient bin; normalize back toward unity before the
            // per-band gain/clamp stage.
            norm: [2.0 / WINDOW_SIZE as f32; NUM_BANDS],
            gains: per_band_gains,
            last_output: [0.0; NUM_BANDS],
        }
    }

    pub fn set_gains(&mut self, gains: [f32; NUM_BANDS]) {
        self.gains = gains;
    }

    pub fn reset(&mut self) {
        self.window = [0.0; WINDOW_SIZE];
        self.write_idx = 0;
        self.hops_since_analysis = 0;
        self.last_output = [0.0; NUM_BANDS];
    }

    /// Writes one hop's worth of samples into the circular window.
    pub fn write_hop(&mut self, hop: &[f32]) {
        debug_assert_eq!(hop.len(), HOP_SIZE);
        for &s in hop {
            self.window[self.write_idx] = s;
            self.write_idx = (self.write_idx + 1) % WINDOW_SIZE;
        }
        self.hops_since_analysis += 1;
    }

    /// Returns true (and fills `out`) when a fresh analysis is available,
    /// i.e. at least one hop has landed since the last call. Callers should
    /// reuse `out`'s previous contents when this returns false.
    pub fn analyze(&mut self, out: &mut [f32; NUM_BANDS]) -> bool {
        if self.hops_since_analysis == 0 {
            return false;
        }
        self.hops_since_analysis = 0;

        // Contiguous copy starting at the oldest sample so the Goertzel
        // recurrence sees the window in chronological order.
        let mut linear = [0.0f32; WINDOW_SIZE];
        for i in 0..WINDOW_SIZE {
            linear[i] = self.window[(self.write_idx + i) % WINDOW_SIZE];
        }

        for b in 0..NUM_BANDS {
            let mag = self.coeffs[b].magnitude(&linear) * self.norm[b] * self.gains[b];
            out[b] = mag.clamp(0.0, 1.0);
        }
        self.last_output = *out;
        true
    }

    pub fn last_output(&self) -> [f32; NUM_BANDS] {
        self.last_output
    }
}

/// Log-spaced 64-bin variant (110 Hz - 4186 Hz) with adaptive max-follower
/// normalization, used for sub-bass detail and tempo novelty.
pub struct GoertzelBins64 {
    window: [f32; WINDOW_SIZE],
    write_idx: usize,
    hops_since_analysis: u32,
    coeffs: Vec<GoertzelCoefficient>,
    follower: [f32; NUM_BINS_64],
    scale: f32,
    floor: f32,
    rise: f32,
    fall: f32,
    decay: f32,
    last_output: [f32; NUM_BINS_64],
}

impl GoertzelBins64 {
    pub fn new(sample_rate_hz: f32, scale: f32, floor: f32, rise: f32, fall: f32, decay: f32) -> Self {
        let coeffs = (0..NUM_BINS_64)
            .map(|i| {
                let t = i as f32 / (NUM_BINS_64 - 1) as f32;
                // log spacing between BIN64_LOW_HZ and BIN64_HIGH_HZ
                let freq = BIN64_LOW_HZ * (BIN64_HIGH_HZ / BIN64_LOW_HZ).powf(t);
                GoertzelCoefficient::new(freq, sample_rate_hz, WINDOW_SIZE)
            })
            .collect();
        Self {
            window: [0.0; WINDOW_SIZE],
            write_idx: 0,
            hops_since_analysis: 0,
            coeffs,
            follower: [1.0; NUM_BINS_64],
            scale,
            floor,
            rise,
            fall,
            decay,
            last_output: [0.0; NUM_BINS_64],
        }
    }

    pub fn set_adaptive_params(&mut self, scale: f32, floor: f32, rise: f32, fall: f32, decay: f32) {
        self.scale = scale;
        self.floor = floor;
        self.rise = rise;
        self.fall = fall;
        self.decay = decay;
    }

    pub fn reset(&mut self) {
        self.window = [0.0; WINDOW_SIZE];
        self.write_idx = 0;
        self.hops_since_analysis = 0;
        self.follower = [1.0; NUM_BINS_64];
        self.last_output = [0.0; NUM_BINS_64];
    }

    pub fn write_hop(&mut self, hop: &[f32]) {
        debug_assert_eq!(hop.len(), HOP_SIZE);
        for &s in hop {
            self.window[self.write_idx] = s;
            self.write_idx = (self.write_idx + 1) % WINDOW_SIZE;
        }
        self.hops_since_analysis += 1;
    }

    pub fn analyze(&mut self, out: &mut [f32; NUM_BINS_64]) -> bool {
        if self.hops_since_analysis == 0 {
            return false;
        }
        self.hops_since_analysis = 0;

        let mut linear = [0.0f32; WINDOW_SIZE];
        for i in 0..WINDOW_SIZE {
            linear[i] = self.window[(self.write_idx + i) % WINDOW_SIZE];
        }

        for b in 0..NUM_BINS_64 {
            // Raw Goertzel magnitudes are tiny relative to the follower
            // floor; `scale` brings them into the same order of magnitude
            // before the max-follower tracks them.
            let mag = self.coeffs[b].magnitude(&linear) * (2.0 / WINDOW_SIZE as f32) * self.scale;

            self.follower[b] = (self.follower[b] * self.decay).max(self.floor).max(
                if mag > self.follower[b] {
                    lerp(self.follower[b], mag, self.rise)
                } else {
                    lerp(self.follower[b], mag, self.fall)
                },
            );

            out[b] = (mag / self.follower[b]).clamp(0.0, 1.0);
        }
        self.last_output = *out;
        true
    }

    pub fn last_output(&self) -> [f32; NUM_BINS_64] {
        self.last_output
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
