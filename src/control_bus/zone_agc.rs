//! Per-zone max-follower normalization: partitions 8 bands into 4 zones of
//! 2 bands each (and chroma into a parallel 4x3 partition), each zone
//! independently normalized by its own max follower.

use super::{NUM_BANDS, NUM_CHROMA};

const NUM_ZONES: usize = 4;
const BANDS_PER_ZONE: usize = NUM_BANDS / NUM_ZONES;
const CHROMA_PER_ZONE: usize = NUM_CHROMA / NUM_ZONES;

#[derive(Debug, Clone, Copy)]
struct ZoneFollower {
    max_mag: f32,
    max_mag_follower: f32,
    attack_rate: f32,
    release_rate: f32,
    min_floor: f32,
}

impl ZoneFollower {
    fn new() -> Self {
        Self {
            max_mag: 0.0,
            max_mag_follower: 1.0,
            attack_rate: 0.05,
            release_rate: 0.05,
            min_floor: 0.01,
        }
    }

    fn reset(&mut self) {
        self.max_mag = 0.0;
        self.max_mag_follower = 1.0;
    }

    fn process(&mut self, values: &mut [f32]) {
        self.max_mag = values.iter().cloned().fold(0.0, f32::max);
        self.max_mag_follower = if self.max_mag > self.max_mag_follower {
            lerp(self.max_mag_follower, self.max_mag, self.attack_rate)
        } else {
            lerp(self.max_mag_follower, self.max_mag, self.release_rate)
        }
        .max(self.min_floor);

        for v in values.iter_mut() {
            *v = (*v / self.max_mag_follower).min(1.0);
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub struct ZoneAgcBank {
    band_zones: [ZoneFollower; NUM_ZONES],
    chroma_zones: [ZoneFollower; NUM_ZONES],
    pub enabled: bool,
}

impl ZoneAgcBank {
    pub fn new() -> Self {
        Self {
            band_zones: [ZoneFollower::new(); NUM_ZONES],
            chroma_zones: [ZoneFollower::new(); NUM_ZONES],
            enabled: true,
        }
    }

    pub fn reset(&mut self) {
        for z in self.band_zones.iter_mut() {
            z.reset();
        }
        for z in self.chroma_zones.iter_mut() {
            z.reset();
        }
    }

    pub fn process_bands(&mut self, mut bands: [f32; NUM_BANDS]) -> [f32; NUM_BANDS] {
        if !self.enabled {
            return bands;
        }
        for (zi, zone) in self.band_zones.iter_mut().enumerate() {
            let start = zi * BANDS_PER_ZONE;
            zone.process(&mut bands[start..start + BANDS_PER_ZONE]);
        }
        bands
    }

    pub fn process_chroma(&mut self, mut chroma: [f32; NUM_CHROMA]) -> [f32; NUM_CHROMA] {
        if !self.enabled {
            return chroma;
        }
        for (zi, zone) in self.chroma_zones.iter_mut().enumerate() {
            let start = zi * CHROMA_PER_ZONE;
            zone.process(&mut chroma[start..start + CHROMA_PER_ZONE]);
        }
        chroma
    }
}

impl Default for ZoneAgcBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loud_zone_normalizes_toward_unity() {
        let mut bank = ZoneAgcBank::new();
        let mut last = [0.0; NUM_BANDS];
        for _ in 0..50 {
            last = bank.process_bands([0.5; NUM_BANDS]);
        }
        assert!(last.iter().all(|&v| v > 0.8));
    }

    #[test]
    fn output_never_exceeds_one() {
        let mut bank = ZoneAgcBank::new();
        for _ in 0..10 {
            let out = bank.process_bands([2.0; NUM_BANDS]);
            assert!(out.iter().all(|&v| v <= 1.0));
        }
    }
}
