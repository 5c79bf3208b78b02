//! `AudioCore`: wires capture, DSP, tempo tracking, calibration, and the
//! `ControlBus` into the one-hop-at-a-time pipeline AudioTask drives.
//!
//! Every method that touches DSP state assumes single-threaded, sequential
//! calls from one hop to the next -- there is no internal locking here. The
//! only cross-thread surfaces are the `Tuning` seqlock (read once per hop)
//! and the `SnapshotBuffer<ControlBusFrame>` (published once per hop). See
//! `engine::audio_task` for the OS thread that drives `run_hop` in a loop.

use std::sync::Arc;

use crate::audio::{AudioSource, CaptureStats};
use crate::calibration::{CalibrationState, NoiseCalibrator};
use crate::control_bus::{ControlBus, ControlBusParams, ControlBusRawInput, ControlBusFrame, NUM_BANDS, NUM_CHROMA, WAVEFORM_N};
use crate::dsp::{agc::normalize_hop, Agc, ChromaAnalyzer, DcBlocker, GoertzelAnalyzer, GoertzelBins64, NoiseFloor, NoveltyFlux};
use crate::error::{CalibrationError, CaptureError, InitError};
use crate::snapshot::SnapshotBuffer;
use crate::tempo::TempoTracker;
use crate::time::{AudioTime, HOP_SIZE, SAMPLE_RATE_HZ};
use crate::tuning::{TuningContract, TuningPipeline, Tuning};

/// Energy threshold (post noise-floor subtraction, still in Goertzel's
/// `[0,1]` magnitude units) above which a snare/hihat trigger fires.
const PERCUSSION_TRIGGER_THRESHOLD: f32 = 0.35;

/// The realtime audio core: owns every per-hop DSP stage plus the
/// `ControlBus`, and publishes one `ControlBusFrame` per `run_hop` call.
pub struct AudioCore {
    source: Box<dyn AudioSource + Send>,
    dc_blocker: DcBlocker,
    agc: Agc,
    noise_floor: NoiseFloor,
    goertzel: GoertzelAnalyzer,
    bins64: GoertzelBins64,
    chroma: ChromaAnalyzer,
    novelty: NoveltyFlux,
    tempo: TempoTracker,
    control_bus: ControlBus,
    calibrator: NoiseCalibrator,
    calibration_applied: bool,

    tuning: Arc<Tuning>,
    snapshot: Arc<SnapshotBuffer<ControlBusFrame>>,
    telemetry: crate::telemetry::TelemetryHub,

    time: AudioTime,
    snare_above: bool,
    hihat_above: bool,
    consecutive_read_errors: u32,

    hop_i16: [i16; HOP_SIZE],
    hop_f32: [f32; HOP_SIZE],
}

/// Consecutive `ReadError`s before AudioTask attempts a single blind
/// re-init of the capture source.
const READ_ERROR_REINIT_THRESHOLD: u32 = 3;

impl AudioCore {
    pub fn new(
        source: Box<dyn AudioSource + Send>,
        tuning: Arc<Tuning>,
        snapshot: Arc<SnapshotBuffer<ControlBusFrame>>,
    ) -> Self {
        let pipeline = tuning.pipeline.read();
        let contract = tuning.contract.read();

        let mut core = Self {
            source,
            dc_blocker: DcBlocker::new(pipeline.dc_alpha),
            agc: Agc::new(
                pipeline.agc_target_rms,
                pipeline.agc_min_gain,
                pipeline.agc_max_gain,
                pipeline.agc_attack,
                pipeline.agc_release,
                pipeline.agc_clip_reduce,
                pipeline.agc_idle_return_rate,
            ),
            noise_floor: NoiseFloor::new(NUM_BANDS, pipeline.noise_floor_min, pipeline.noise_floor_fall),
            goertzel: GoertzelAnalyzer::new(SAMPLE_RATE_HZ as f32, pipeline.per_band_gains),
            bins64: GoertzelBins64::new(
                SAMPLE_RATE_HZ as f32,
                pipeline.bins64_adaptive_scale,
                pipeline.bins64_adaptive_floor,
                pipeline.bins64_adaptive_rise,
                pipeline.bins64_adaptive_fall,
                pipeline.bins64_adaptive_decay,
            ),
            chroma: ChromaAnalyzer::new(SAMPLE_RATE_HZ as f32),
            novelty: NoveltyFlux::new(
                NUM_BANDS,
                pipeline.novelty_use_spectral_flux,
                pipeline.novelty_spectral_flux_scale,
                pipeline.flux_scale,
            ),
            tempo: TempoTracker::new(
                SAMPLE_RATE_HZ as f32,
                contract.bpm_min,
                contract.bpm_max,
                contract.bpm_tau,
                contract.confidence_tau,
                contract.phase_correction_gain,
                contract.bar_correction_gain,
                contract.beats_per_bar,
                13,
            ),
            control_bus: ControlBus::new(control_bus_params(&pipeline)),
            calibrator: NoiseCalibrator::new(),
            calibration_applied: false,
            tuning,
            snapshot,
            telemetry: crate::telemetry::TelemetryHub::new(),
            time: AudioTime::new(SAMPLE_RATE_HZ),
            snare_above: false,
            hihat_above: false,
            consecutive_read_errors: 0,
            hop_i16: [0; HOP_SIZE],
            hop_f32: [0.0; HOP_SIZE],
        };
        core.noise_floor.set_per_band_override(
            Some(pipeline.per_band_noise_floors.to_vec()),
            pipeline.use_per_band_noise_floor,
        );
        core
    }

    /// Initializes the capture source. Fatal: AudioTask must not start if
    /// this returns an error.
    pub fn init(&mut self) -> Result<(), InitError> {
        self.source.init()
    }

    /// Hardware mic-gain trim passthrough; a no-op for sources without one.
    pub fn set_mic_gain_db(&mut self, db: f32) {
        self.source.set_mic_gain_db(db);
    }

    /// User-triggered noise-floor calibration using the caller's
    /// `duration_ms`/`safety_multiplier`.
    pub fn start_calibration(&mut self, duration_ms: f32, safety_multiplier: f32) -> Result<(), CalibrationError> {
        self.calibration_applied = false;
        self.calibrator.start(duration_ms, safety_multiplier)
    }

    pub fn calibration_state(&self) -> CalibrationState {
        self.calibrator.state()
    }

    pub fn reset(&mut self) {
        self.dc_blocker.reset();
        self.agc.reset();
        self.noise_floor.reset(0.0);
        self.goertzel.reset();
        self.bins64.reset();
        self.chroma.reset();
        self.novelty.reset();
        self.tempo.reset();
        self.control_bus.reset();
        self.calibrator.reset();
        self.calibration_applied = false;
        self.time = AudioTime::new(SAMPLE_RATE_HZ);
        self.snare_above = false;
        self.hihat_above = false;
        self.consecutive_read_errors = 0;
    }

    /// Re-reads `Tuning` and applies every knob to its owning DSP stage.
    /// Called once at the top of every hop.
    fn apply_tuning(&mut self) -> TuningPipeline {
        let pipeline = self.tuning.pipeline.read();
        let contract: TuningContract = self.tuning.contract.read();

        self.dc_blocker.set_dc_alpha(pipeline.dc_alpha);
        self.agc.set_params(
            pipeline.agc_target_rms,
            pipeline.agc_min_gain,
            pipeline.agc_max_gain,
            pipeline.agc_attack,
            pipeline.agc_release,
            pipeline.agc_clip_reduce,
            pipeline.agc_idle_return_rate,
        );
        // `NoiseFloor` exposes a single leaky-min rate; `noise_floor_fall`
        // governs how fast the tracked minimum is allowed to decay back up
        // once the signal quiets down, which is the rate that matters for a
        // leaky-min tracker. `noise_floor_rise` has no effect until
        // `NoiseFloor` grows a second rate for the opposite direction.
        self.noise_floor.set_leak_rate(pipeline.noise_floor_fall);
        self.noise_floor.set_per_band_override(
            Some(pipeline.per_band_noise_floors.to_vec()),
            pipeline.use_per_band_noise_floor,
        );
        self.goertzel.set_gains(pipeline.per_band_gains);
        self.bins64.set_adaptive_params(
            pipeline.bins64_adaptive_scale,
            pipeline.bins64_adaptive_floor,
            pipeline.bins64_adaptive_rise,
            pipeline.bins64_adaptive_fall,
            pipeline.bins64_adaptive_decay,
        );
        self.novelty.set_params(
            pipeline.novelty_use_spectral_flux,
            pipeline.novelty_spectral_flux_scale,
            pipeline.flux_scale,
        );
        self.tempo.set_contract(
            contract.bpm_min,
            contract.bpm_max,
            contract.bpm_tau,
            contract.confidence_tau,
            contract.phase_correction_gain,
            contract.bar_correction_gain,
            contract.beats_per_bar,
        );
        self.control_bus.set_params(control_bus_params(&pipeline));

        pipeline
    }

    /// Captures, analyzes, and publishes exactly one hop. Capture errors are
    /// non-fatal: the hop proceeds with a zero-filled buffer and the error is
    /// swallowed here (the source's own `CaptureStats` already counts it).
    /// Three consecutive `ReadError`s trigger a single blind re-init attempt
    /// before AudioTask continues with silent hops.
    pub fn run_hop(&mut self) -> Result<(), CaptureError> {
        let pipeline = self.apply_tuning();

        self.hop_i16 = [0; HOP_SIZE];
        match self.source.capture_hop(&mut self.hop_i16) {
            Ok(()) => self.consecutive_read_errors = 0,
            Err(CaptureError::ReadError) => {
                self.consecutive_read_errors += 1;
                log::warn!(
                    "capture_hop read error ({}/{} before re-init), publishing a silent hop",
                    self.consecutive_read_errors,
                    READ_ERROR_REINIT_THRESHOLD
                );
                if self.consecutive_read_errors >= READ_ERROR_REINIT_THRESHOLD {
                    log::warn!("three consecutive read errors, attempting a single re-init");
                    if let Err(reinit_err) = self.source.init() {
                        log::error!("re-init after repeated read errors failed: {reinit_err}");
                    }
                    self.consecutive_read_errors = 0;
                }
            }
            Err(err) => {
                log::debug!("capture_hop returned {err}, publishing a silent hop");
            }
        }

        normalize_hop(&self.hop_i16, &mut self.hop_f32);
        self.dc_blocker.process_hop(&mut self.hop_f32);

        let noise_floor_rms = mean(self.noise_floor.floors());
        let agc_report = self.agc.process_hop(&mut self.hop_f32, noise_floor_rms);
        let post_rms = rms(&self.hop_f32);

        self.goertzel.write_hop(&self.hop_f32);
        let mut bands = [0.0; NUM_BANDS];
        self.goertzel.analyze(&mut bands);

        self.bins64.write_hop(&self.hop_f32);
        let mut bins64_out = [0.0; crate::control_bus::NUM_BINS_64];
        self.bins64.analyze(&mut bins64_out);

        self.chroma.write_hop(&self.hop_f32);
        let mut chroma_out = [0.0; NUM_CHROMA];
        self.chroma.analyze(&mut chroma_out);

        self.noise_floor.update(&bands, agc_report.clipped);
        let mut bands_gated = [0.0; NUM_BANDS];
        self.noise_floor.subtract(&bands, &mut bands_gated, pipeline.gate_start_factor);

        let flux = self.novelty.process(&bands_gated);
        let tempo_out = self.tempo.process(flux, post_rms);

        let _ = self.calibrator.process(&bands_gated, &chroma_out, post_rms);
        if self.calibrator.state() == CalibrationState::Complete && !self.calibration_applied {
            self.calibration_applied = self.calibrator.apply_to_tuning(&self.tuning);
        }

        // Snare/hihat: a higher-mid band pair (500 Hz/1 kHz) for the snare
        // body, the top two bands (4 kHz/7.8 kHz) for hihat/cymbal shimmer.
        // Triggers fire on the rising edge across a fixed threshold rather
        // than every hop the energy stays elevated.
        let snare_energy = (bands_gated[3] + bands_gated[4]) * 0.5;
        let hihat_energy = (bands_gated[6] + bands_gated[7]) * 0.5;
        let snare_above_now = snare_energy > PERCUSSION_TRIGGER_THRESHOLD;
        let hihat_above_now = hihat_energy > PERCUSSION_TRIGGER_THRESHOLD;
        let snare_trigger = snare_above_now && !self.snare_above;
        let hihat_trigger = hihat_above_now && !self.hihat_above;
        self.snare_above = snare_above_now;
        self.hihat_above = hihat_above_now;

        let mut waveform = [0i16; WAVEFORM_N];
        for (i, slot) in waveform.iter_mut().enumerate() {
            *slot = self.hop_i16[i * 2];
        }

        let raw = ControlBusRawInput {
            rms: post_rms,
            flux,
            bands: bands_gated,
            chroma: chroma_out,
            waveform,
            bins64: bins64_out,
            snare_energy,
            hihat_energy,
            snare_trigger,
            hihat_trigger,
            tempo_locked: tempo_out.locked,
            tempo_confidence: tempo_out.confidence,
            tempo_beat_tick: tempo_out.beat_tick,
        };

        self.time.advance(HOP_SIZE);
        let frame = self.control_bus.update_from_hop(self.time, &raw);
        self.snapshot.publish(frame);

        self.telemetry.record_capture_stats(self.source.stats());
        self.telemetry.record_spike_stats(self.control_bus.spike_stats());
        self.telemetry.record_agc_gain(agc_report.gain);
        self.telemetry.record_noise_floor(self.noise_floor.floors());
        self.telemetry.record_tempo(&tempo_out);

        Ok(())
    }

    pub fn capture_stats(&self) -> CaptureStats {
        self.source.stats()
    }

    /// This core's own telemetry counters. Each `AudioCore` owns an
    /// independent `TelemetryHub` rather than reaching into process-global
    /// state, so multiple cores in one process (e.g. in tests) never cross
    /// streams.
    pub fn telemetry(&self) -> &crate::telemetry::TelemetryHub {
        &self.telemetry
    }
}

fn control_bus_params(pipeline: &TuningPipeline) -> ControlBusParams {
    ControlBusParams {
        alpha_fast: pipeline.control_bus_alpha_fast,
        alpha_slow: pipeline.control_bus_alpha_slow,
        band_attack: pipeline.band_attack,
        band_release: pipeline.band_release,
        heavy_band_attack: pipeline.heavy_band_attack,
        heavy_band_release: pipeline.heavy_band_release,
        silence_threshold: pipeline.silence_threshold,
        silence_hysteresis_ms: pipeline.silence_hysteresis_ms,
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn rms(hop: &[f32]) -> f32 {
    if hop.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = hop.iter().map(|s| s * s).sum();
    (sum_sq / hop.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SyntheticAudioSource;

    fn make_core() -> AudioCore {
        let source = Box::new(SyntheticAudioSource::silence(64));
        let tuning = Arc::new(Tuning::new());
        let snapshot = Arc::new(SnapshotBuffer::new());
        AudioCore::new(source, tuning, snapshot)
    }

    #[test]
    fn run_hop_publishes_monotonic_sample_index() {
        let mut core = make_core();
        core.init().unwrap();
        core.run_hop().unwrap();
        let first = core.snapshot.read();
        core.run_hop().unwrap();
        let second = core.snapshot.read();
        assert_eq!(second.t.sample_index, first.t.sample_index + HOP_SIZE as u64);
        assert_eq!(second.hop_seq, first.hop_seq + 1);
    }

    #[test]
    fn silence_yields_silent_frame() {
        let mut core = make_core();
        core.init().unwrap();
        for _ in 0..400 {
            core.run_hop().unwrap();
        }
        let frame = core.snapshot.read();
        assert!(frame.is_silent);
    }

    #[test]
    fn waveform_is_decimated_capture() {
        let samples: Vec<i16> = (0..HOP_SIZE as i16).collect();
        let source = Box::new(SyntheticAudioSource::new(samples, true));
        let tuning = Arc::new(Tuning::new());
        let snapshot = Arc::new(SnapshotBuffer::new());
        let mut core = AudioCore::new(source, tuning, snapshot);
        core.init().unwrap();
        core.run_hop().unwrap();
        let frame = core.snapshot.read();
        assert_eq!(frame.waveform[1], 2);
        assert_eq!(frame.waveform[0], 0);
    }

    #[test]
    fn calibration_applies_to_tuning_once_complete() {
        let mut core = make_core();
        core.init().unwrap();
        core.start_calibration(50.0, 1.2).unwrap();
        for _ in 0..50 {
            core.run_hop().unwrap();
        }
        assert_eq!(core.calibration_state(), CalibrationState::Complete);
        assert!(core.tuning.pipeline.read().use_per_band_noise_floor);
    }
}
