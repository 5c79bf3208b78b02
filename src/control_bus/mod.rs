//! ControlBus: turns raw per-hop DSP measurements into the publishable
//! `ControlBusFrame`, via lookahead despike, zone AGC, asymmetric
//! smoothing, chord detection, saliency, style classification, and
//! silence gating.

pub mod chord;
pub mod lookahead;
pub mod saliency;
pub mod silence;
pub mod style;
pub mod zone_agc;

use crate::time::AudioTime;
use chord::{ChordDetector, ChordState};
use lookahead::{LookaheadDespike, SpikeDetectionStats};
use saliency::{SaliencyTracker, MusicalSaliency};
use serde::{Deserialize, Serialize};
use silence::SilenceGate;
use style::{classify_style, MusicStyle};
use zone_agc::ZoneAgcBank;

pub const NUM_BANDS: usize = 8;
pub const NUM_CHROMA: usize = 12;
pub const WAVEFORM_N: usize = 128;
pub const NUM_BINS_64: usize = 64;

/// Unsmoothed per-hop measurements handed to `ControlBus::update_from_hop`.
#[derive(Debug, Clone)]
pub struct ControlBusRawInput {
    pub rms: f32,
    pub flux: f32,
    pub bands: [f32; NUM_BANDS],
    pub chroma: [f32; NUM_CHROMA],
    pub waveform: [i16; WAVEFORM_N],
    pub bins64: [f32; NUM_BINS_64],
    pub snare_energy: f32,
    pub hihat_energy: f32,
    pub snare_trigger: bool,
    pub hihat_trigger: bool,
    pub tempo_locked: bool,
    pub tempo_confidence: f32,
    pub tempo_beat_tick: bool,
}

impl Default for ControlBusRawInput {
    fn default() -> Self {
        Self {
            rms: 0.0,
            flux: 0.0,
            bands: [0.0; NUM_BANDS],
            chroma: [0.0; NUM_CHROMA],
            waveform: [0; WAVEFORM_N],
            bins64: [0.0; NUM_BINS_64],
            snare_energy: 0.0,
            hihat_energy: 0.0,
            snare_trigger: false,
            hihat_trigger: false,
            tempo_locked: false,
            tempo_confidence: 0.0,
            tempo_beat_tick: false,
        }
    }
}

/// The one cross-core payload, copied whole through `SnapshotBuffer`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControlBusFrame {
    pub t: AudioTime,
    pub hop_seq: u32,

    pub rms: f32,
    pub flux: f32,
    pub fast_rms: f32,
    pub fast_flux: f32,

    pub bands: [f32; NUM_BANDS],
    pub chroma: [f32; NUM_CHROMA],
    pub heavy_bands: [f32; NUM_BANDS],
    pub heavy_chroma: [f32; NUM_CHROMA],

    pub waveform: [i16; WAVEFORM_N],
    pub bins64: [f32; NUM_BINS_64],

    pub chord_state: ChordState,
    pub saliency: MusicalSaliency,

    pub music_style: MusicStyle,
    pub style_confidence: f32,

    pub snare_energy: f32,
    pub hihat_energy: f32,
    pub snare_trigger: bool,
    pub hihat_trigger: bool,

    pub tempo_locked: bool,
    pub tempo_confidence: f32,
    pub tempo_beat_tick: bool,

    pub silent_scale: f32,
    pub is_silent: bool,
}

impl Default for ControlBusFrame {
    fn default() -> Self {
        Self {
            t: AudioTime::default(),
            hop_seq: 0,
            rms: 0.0,
            flux: 0.0,
            fast_rms: 0.0,
            fast_flux: 0.0,
            bands: [0.0; NUM_BANDS],
            chroma: [0.0; NUM_CHROMA],
            heavy_bands: [0.0; NUM_BANDS],
            heavy_chroma: [0.0; NUM_CHROMA],
            waveform: [0; WAVEFORM_N],
            bins64: [0.0; NUM_BINS_64],
            chord_state: ChordState::default(),
            saliency: MusicalSaliency::default(),
            music_style: MusicStyle::Unknown,
            style_confidence: 0.0,
            snare_energy: 0.0,
            hihat_energy: 0.0,
            snare_trigger: false,
            hihat_trigger: false,
            tempo_locked: false,
            tempo_confidence: 0.0,
            tempo_beat_tick: false,
            silent_scale: 1.0,
            is_silent: false,
        }
    }
}

/// Smoothing/AGC/detection coefficients consumed by `ControlBus`. A subset
/// of `tuning::TuningPipeline`, passed in each hop so the bus itself holds
/// no reference back into the seqlock.
#[derive(Debug, Clone, Copy)]
pub struct ControlBusParams {
    pub alpha_fast: f32,
    pub alpha_slow: f32,
    pub band_attack: f32,
    pub band_release: f32,
    pub heavy_band_attack: f32,
    pub heavy_band_release: f32,
    pub silence_threshold: f32,
    pub silence_hysteresis_ms: f32,
}

pub struct ControlBus {
    despike_bands: LookaheadDespike<NUM_BANDS>,
    despike_chroma: LookaheadDespike<NUM_CHROMA>,
    zone_agc: ZoneAgcBank,
    chord: ChordDetector,
    saliency: SaliencyTracker,
    silence: SilenceGate,

    fast_rms: f32,
    slow_rms: f32,
    fast_flux: f32,
    slow_flux: f32,
    bands_s: [f32; NUM_BANDS],
    heavy_bands_s: [f32; NUM_BANDS],
    chroma_s: [f32; NUM_CHROMA],
    heavy_chroma_s: [f32; NUM_CHROMA],

    prev_hop_seq: u32,
    params: ControlBusParams,
}

impl ControlBus {
    pub fn new(params: ControlBusParams) -> Self {
        Self {
            despike_bands: LookaheadDespike::new(),
            despike_chroma: LookaheadDespike::new(),
            zone_agc: ZoneAgcBank::new(),
            chord: ChordDetector::new(),
            saliency: SaliencyTracker::new(),
            silence: SilenceGate::new(),
            fast_rms: 0.0,
            slow_rms: 0.0,
            fast_flux: 0.0,
            slow_flux: 0.0,
            bands_s: [0.0; NUM_BANDS],
            heavy_bands_s: [0.0; NUM_BANDS],
            chroma_s: [0.0; NUM_CHROMA],
            heavy_chroma_s: [0.0; NUM_CHROMA],
            prev_hop_seq: 0,
            params,
        }
    }

    pub fn set_params(&mut self, params: ControlBusParams) {
        self.params = params;
    }

    pub fn reset(&mut self) {
        self.despike_bands.reset();
        self.despike_chroma.reset();
        self.zone_agc.reset();
        self.chord.reset();
        self.saliency.reset();
        self.silence.reset();
        self.fast_rms = 0.0;
        self.slow_rms = 0.0;
        self.fast_flux = 0.0;
        self.slow_flux = 0.0;
        self.bands_s = [0.0; NUM_BANDS];
        self.heavy_bands_s = [0.0; NUM_BANDS];
        self.chroma_s = [0.0; NUM_CHROMA];
        self.heavy_chroma_s = [0.0; NUM_CHROMA];
        self.prev_hop_seq = 0;
    }

    pub fn spike_stats(&self) -> SpikeDetectionStats {
        let mut stats = self.despike_bands.stats();
        let chroma_stats = self.despike_chroma.stats();
        stats.merge(&chroma_stats);
        stats
    }

    /// Runs the full pipeline (clamp -> despike -> zone AGC -> smoothing ->
    /// chord -> saliency -> style -> silence -> publish) and returns the
    /// new frame. `t` is the timestamp for this hop, already advanced by
    /// the caller.
    pub fn update_from_hop(&mut self, t: AudioTime, raw: &ControlBusRawInput) -> ControlBusFrame {
        // 1. Clamp. `flux` is already scaled by `flux_scale`/
        // `spectral_flux_scale` in `NoveltyFlux::process`; re-scaling here
        // would apply `flux_scale` twice.
        let rms = raw.rms.clamp(0.0, 1.0);
        let flux = raw.flux.clamp(0.0, 1.0);
        let mut bands = raw.bands;
        let mut chroma = raw.chroma;
        for b in bands.iter_mut() {
            *b = b.clamp(0.0, 1.0);
        }
        for c in chroma.iter_mut() {
            *c = c.clamp(0.0, 1.0);
        }

        // 2. Lookahead despike
        let bands_despiked = self.despike_bands.push(bands);
        let chroma_despiked = self.despike_chroma.push(chroma);

        // 3. Zone AGC
        let bands_agc = self.zone_agc.process_bands(bands_despiked);
        let chroma_agc = self.zone_agc.process_chroma(chroma_despiked);

        // 4. Asymmetric smoothing
        self.fast_rms = smooth(self.fast_rms, rms, self.params.alpha_fast);
        self.slow_rms = smooth(self.slow_rms, rms, self.params.alpha_slow);
        self.fast_flux = smooth(self.fast_flux, flux, self.params.alpha_fast);
        self.slow_flux = smooth(self.slow_flux, flux, self.params.alpha_slow);

        for i in 0..NUM_BANDS {
            self.bands_s[i] = asym_smooth(self.bands_s[i], bands_agc[i], self.params.band_attack, self.params.band_release);
            self.heavy_bands_s[i] = asym_smooth(
                self.heavy_bands_s[i],
                bands_agc[i],
                self.params.heavy_band_attack,
                self.params.heavy_band_release,
            );
        }
        for i in 0..NUM_CHROMA {
            self.chroma_s[i] = asym_smooth(self.chroma_s[i], chroma_agc[i], self.params.band_attack, self.params.band_release);
            self.heavy_chroma_s[i] = asym_smooth(
                self.heavy_chroma_s[i],
                chroma_agc[i],
                self.params.heavy_band_attack,
                self.params.heavy_band_release,
            );
        }

        // 5. Chord detection
        let chord_state = self.chord.detect(&self.chroma_s);

        // 6. Saliency
        let saliency = self.saliency.update(&self.chroma_s, raw.tempo_confidence, &self.bands_s, flux);

        // 7. Style detection
        let (music_style, style_confidence) = classify_style(&saliency, &self.bands_s);

        // 8. Silence detection
        let silent_scale = self.silence.update(self.slow_rms, self.params.silence_threshold, self.params.silence_hysteresis_ms);
        let is_silent = silent_scale < 0.01;

        // 9. Publish
        self.prev_hop_seq = self.prev_hop_seq.wrapping_add(1);

        ControlBusFrame {
            t,
            hop_seq: self.prev_hop_seq,
            rms: self.slow_rms,
            flux: self.slow_flux,
            fast_rms: self.fast_rms,
            fast_flux: self.fast_flux,
            bands: self.bands_s,
            chroma: self.chroma_s,
            heavy_bands: self.heavy_bands_s,
            heavy_chroma: self.heavy_chroma_s,
            waveform: raw.waveform,
            bins64: raw.bins64,
            chord_state,
            saliency,
            music_style,
            style_confidence,
            snare_energy: raw.snare_energy.clamp(0.0, 1.0),
            hihat_energy: raw.hihat_energy.clamp(0.0, 1.0),
            snare_trigger: raw.snare_trigger,
            hihat_trigger: raw.hihat_trigger,
            tempo_locked: raw.tempo_locked,
            tempo_confidence: raw.tempo_confidence.clamp(0.0, 1.0),
            tempo_beat_tick: raw.tempo_beat_tick,
            silent_scale,
            is_silent,
        }
    }
}

fn smooth(prev: f32, input: f32, alpha: f32) -> f32 {
    prev + (input - prev) * alpha
}

fn asym_smooth(prev: f32, input: f32, attack: f32, release: f32) -> f32 {
    if input > prev {
        prev + (input - prev) * attack
    } else {
        prev + (input - prev) * release
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_params() -> ControlBusParams {
        ControlBusParams {
            alpha_fast: 0.35,
            alpha_slow: 0.12,
            band_attack: 0.15,
            band_release: 0.03,
            heavy_band_attack: 0.08,
            heavy_band_release: 0.015,
            silence_threshold: 0.01,
            silence_hysteresis_ms: 5000.0,
        }
    }

    #[test]
    fn hop_seq_is_strictly_monotonic() {
        let mut bus = ControlBus::new(default_params());
        let mut t = AudioTime::new(16_000);
        let raw = ControlBusRawInput::default();
        let mut prev_seq = 0;
        for i in 0..10 {
            t.advance(crate::time::HOP_SIZE);
            let frame = bus.update_from_hop(t, &raw);
            if i > 0 {
                assert_eq!(frame.hop_seq, prev_seq + 1);
            }
            prev_seq = frame.hop_seq;
        }
    }

    #[test]
    fn unit_interval_fields_stay_bounded() {
        let mut bus = ControlBus::new(default_params());
        let t = AudioTime::new(16_000);
        let mut raw = ControlBusRawInput::default();
        raw.rms = 5.0; // out of range input
        raw.bands = [5.0; NUM_BANDS];
        raw.chroma = [-1.0; NUM_CHROMA];
        let frame = bus.update_from_hop(t, &raw);
        assert!(frame.rms >= 0.0 && frame.rms <= 1.0);
        assert!(frame.bands.iter().all(|&b| (0.0..=1.0).contains(&b)));
        assert!(frame.chroma.iter().all(|&c| (0.0..=1.0).contains(&c)));
    }

    #[test]
    fn spike_is_despiked_toward_neighbor_average() {
        let mut bus = ControlBus::new(default_params());
        let t = AudioTime::new(16_000);
        let mut raw = ControlBusRawInput::default();
        raw.bands = [0.1; NUM_BANDS];

        bus.update_from_hop(t, &raw);
        raw.bands[2] = 0.9;
        bus.update_from_hop(t, &raw);
        raw.bands[2] = 0.1;
        bus.update_from_hop(t, &raw);
        let frame = bus.update_from_hop(t, &raw);
        // After the 2-frame despike delay and smoothing settle, band 2
        // should not have tracked the isolated spike up near 0.9.
        assert!(frame.bands[2] < 0.5);
    }
}
