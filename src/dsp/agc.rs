//! Target-RMS automatic gain control with asymmetric attack/release.

use crate::dsp::FULL_SCALE;

/// Single-scalar gain applied to the whole hop before further analysis.
#[derive(Debug, Clone, Copy)]
pub struct Agc {
    gain: f32,
    target_rms: f32,
    min_gain: f32,
    max_gain: f32,
    attack: f32,
    release: f32,
    clip_reduce: f32,
    idle_return_rate: f32,
    clip_threshold: f32,
}

/// Result of processing one hop, used by the rest of the pipeline and by
/// observability counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgcReport {
    pub gain: f32,
    pub rms_in: f32,
    pub clipped: bool,
}

impl Agc {
    pub fn new(
        target_rms: f32,
        min_gain: f32,
        max_gain: f32,
        attack: f32,
        release: f32,
        clip_reduce: f32,
        idle_return_rate: f32,
    ) -> Self {
        Self {
            gain: 1.0,
            target_rms,
            min_gain,
            max_gain,
            attack,
            release,
            clip_reduce,
            idle_return_rate,
            clip_threshold: 0.98,
        }
    }

    pub fn reset(&mut self) {
        self.gain = 1.0;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_params(
        &mut self,
        target_rms: f32,
        min_gain: f32,
        max_gain: f32,
        attack: f32,
        release: f32,
        clip_reduce: f32,
        idle_return_rate: f32,
    ) {
        self.target_rms = target_rms;
        self.min_gain = min_gain;
        self.max_gain = max_gain;
        self.attack = attack;
        self.release = release;
        self.clip_reduce = clip_reduce;
        self.idle_return_rate = idle_return_rate;
        self.gain = self.gain.clamp(self.min_gain, self.max_gain);
    }

    /// Applies the gain in place to a hop of samples already normalized to
    /// `[-1, 1]` (post DC-blocker). Returns the report for this hop.
    pub fn process_hop(&mut self, hop: &mut [f32], noise_floor_rms: f32) -> AgcReport {
        let rms_in = rms(hop);

        let clipped = hop.iter().any(|s| s.abs() > self.clip_threshold);

        let desired = (self.target_rms / rms_in.max(1e-6)).clamp(self.min_gain, self.max_gain);
        self.gain = if desired > self.gain {
            lerp(self.gain, desired, self.attack)
        } else {
            lerp(self.gain, desired, self.release)
        };

        if clipped {
            self.gain *= self.clip_reduce;
        }

        let idle_threshold = noise_floor_rms * 0.5;
        if rms_in < idle_threshold {
            self.gain = lerp(self.gain, 1.0, self.idle_return_rate);
        }

        self.gain = self.gain.clamp(self.min_gain, self.max_gain);

        for sample in hop.iter_mut() {
            *sample *= self.gain;
        }

        AgcReport {
            gain: self.gain,
            rms_in,
            clipped,
        }
    }
}

fn rms(hop: &[f32]) -> f32 {
    if hop.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = hop.iter().map(|s| s * s).sum();
    (sum_sq / hop.len() as f32).sqrt()
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Converts a raw i16 hop into `[-1, 1]` floats.
pub fn normalize_hop(src: &[i16], dst: &mut [f32]) {
    for (s, d) in src.iter().zip(dst.iter_mut()) {
        *d = *s as f32 / FULL_SCALE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_agc() -> Agc {
        Agc::new(0.25, 1.0, 40.0, 0.03, 0.015, 0.90, 0.01)
    }

    #[test]
    fn gain_stays_in_bounds() {
        let mut agc = make_agc();
        for _ in 0..200 {
            let mut hop = vec![0.001; 256];
            let report = agc.process_hop(&mut hop, 0.0004);
            assert!(report.gain >= 1.0 && report.gain <= 40.0);
        }
    }

    #[test]
    fn clipping_reduces_gain() {
        let mut agc = make_agc();
        // warm up gain above 1.0
        for _ in 0..50 {
            let mut hop = vec![0.01; 256];
            agc.process_hop(&mut hop, 0.0004);
        }
        let gain_before = agc.gain();
        let mut clipped_hop = vec![0.99; 256];
        agc.process_hop(&mut clipped_hop, 0.0004);
        assert!(agc.gain() < gain_before);
    }

    #[test]
    fn idle_signal_returns_gain_to_unity() {
        let mut agc = Agc::new(0.25, 1.0, 40.0, 0.03, 0.015, 0.90, 0.2);
        for _ in 0..30 {
            let mut hop = vec![0.01; 256];
            agc.process_hop(&mut hop, 0.0004);
        }
        let gain_loud = agc.gain();
        for _ in 0..200 {
            let mut hop = vec![0.0; 256];
            agc.process_hop(&mut hop, 0.0004);
        }
        assert!(agc.gain() < gain_loud);
    }
}
