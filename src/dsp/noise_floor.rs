//! Per-band leaky-min noise floor tracker, frozen during clipping.

pub const DEFAULT_LEAK_RATE: f32 = 0.999;
pub const DEFAULT_GATE_START_FACTOR: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct NoiseFloor {
    floor: Vec<f32>,
    leak_rate: f32,
    per_band_override: Option<Vec<f32>>,
    use_per_band_override: bool,
}

impl NoiseFloor {
    pub fn new(num_bands: usize, initial_floor: f32, leak_rate: f32) -> Self {
        Self {
            floor: vec![initial_floor; num_bands],
            leak_rate,
            per_band_override: None,
            use_per_band_override: false,
        }
    }

    pub fn set_leak_rate(&mut self, leak_rate: f32) {
        self.leak_rate = leak_rate;
    }

    pub fn set_per_band_override(&mut self, floors: Option<Vec<f32>>, enabled: bool) {
        self.per_band_override = floors;
        self.use_per_band_override = enabled;
    }

    pub fn reset(&mut self, initial_floor: f32) {
        for f in self.floor.iter_mut() {
            *f = initial_floor;
        }
    }

    /// Updates the leaky-min estimate unless `clipping` is true, in which
    /// case the floor is frozen for this hop.
    pub fn update(&mut self, mags: &[f32], clipping: bool) {
        if clipping {
            return;
        }
        for (f, &mag) in self.floor.iter_mut().zip(mags.iter()) {
            let current_min = f.min(mag);
            *f = lerp(*f, current_min, 1.0 - self.leak_rate);
        }
    }

    /// Subtracts `k * floor` (or the per-band override, when enabled) from
    /// each magnitude, clamped at zero.
    pub fn subtract(&self, mags_in: &[f32], mags_out: &mut [f32], k: f32) {
        for (i, (&m, out)) in mags_in.iter().zip(mags_out.iter_mut()).enumerate() {
            let floor = if self.use_per_band_override {
                self.per_band_override
                    .as_ref()
                    .and_then(|v| v.get(i))
                    .copied()
                    .unwrap_or(self.floor[i])
            } else {
                self.floor[i]
            };
            *out = (m - k * floor).max(0.0);
        }
    }

    pub fn floor(&self, band: usize) -> f32 {
        self.floor[band]
    }

    pub fn floors(&self) -> &[f32] {
        &self.floor
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
    fn floor_tracks_minimum_downward() {
        let mut nf = NoiseFloor::new(1, 1.0, 0.9);
        for _ in 0..100 {
            nf.update(&[0.01], false);
        }
        assert!(nf.floor(0) < 0.5);
    }

    #[test]
    fn floor_frozen_during_clipping() {
        let mut nf = NoiseFloor::new(1, 0.1, 0.999);
        nf.update(&[0.0001], true);
        assert_eq!(nf.floor(0), 0.1);
    }

    #[test]
    fn subtract_is_gated_and_nonnegative() {
        let nf = NoiseFloor::new(2, 0.01, 0.999);
        let mut out = [0.0; 2];
        nf.subtract(&[0.005, 0.5], &mut out, 1.5);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - (0.5 - 0.015)).abs() < 1e-6);
    }

    #[test]
    fn per_band_override_takes_precedence() {
        let mut nf = NoiseFloor::new(2, 0.01, 0.999);
        nf.set_per_band_override(Some(vec![0.2, 0.3]), true);
        let mut out = [0.0; 2];
        nf.subtract(&[1.0, 1.0], &mut out, 1.0);
        assert!((out[0] - 0.8).abs() < 1e-6);
        assert!((out[1] - 0.7).abs() < 1e-6);
    }
}
