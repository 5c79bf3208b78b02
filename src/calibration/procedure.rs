//! `NoiseCalibrator` drives the Idle -> Requested -> Measuring ->
//! Complete/Failed noise-floor measurement procedure.
//!
//! AudioTask calls `request()` when the user asks for calibration, then
//! feeds every hop's bands/chroma/rms through `process()` until the state
//! leaves `Measuring`. A loud hop anywhere during `Measuring` aborts the
//! procedure rather than publishing a contaminated floor.

use crate::calibration::state::{CalibrationState, NoiseCalibrationResult, NUM_BANDS, NUM_CHROMA};
use crate::error::calibration::CalibrationError;
use crate::time::HOP_SIZE;

const HOP_MS: f32 = HOP_SIZE as f32 / 16_000.0 * 1000.0;

pub struct NoiseCalibrator {
    state: CalibrationState,
    duration_ms: f32,
    safety_multiplier: f32,
    max_allowed_rms: f32,

    elapsed_ms: f32,
    band_sum: [f32; NUM_BANDS],
    chroma_sum: [f32; NUM_CHROMA],
    rms_sum: f32,
    peak_rms: f32,
    sample_count: u32,

    result: Option<NoiseCalibrationResult>,
}

impl NoiseCalibrator {
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Idle,
            duration_ms: 3000.0,
            safety_multiplier: 1.2,
            max_allowed_rms: 0.15,
            elapsed_ms: 0.0,
            band_sum: [0.0; NUM_BANDS],
            chroma_sum: [0.0; NUM_CHROMA],
            rms_sum: 0.0,
            peak_rms: 0.0,
            sample_count: 0,
            result: None,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn result(&self) -> Option<&NoiseCalibrationResult> {
        self.result.as_ref()
    }

    /// User-triggered start. Fails if a calibration is already underway.
    pub fn request(&mut self) -> Result<(), CalibrationError> {
        match self.state {
            CalibrationState::Requested | CalibrationState::Measuring => {
                Err(CalibrationError::AlreadyInProgress)
            }
            _ => {
                self.reset_accumulators();
                self.state = CalibrationState::Requested;
                Ok(())
            }
        }
    }

    /// User-triggered start with caller-supplied duration/safety margin.
    /// Same rejection rule as `request()`.
    pub fn start(&mut self, duration_ms: f32, safety_multiplier: f32) -> Result<(), CalibrationError> {
        match self.state {
            CalibrationState::Requested | CalibrationState::Measuring => {
                Err(CalibrationError::AlreadyInProgress)
            }
            _ => {
                self.duration_ms = duration_ms.max(1.0);
                self.safety_multiplier = safety_multiplier.max(1.0);
                self.reset_accumulators();
                self.state = CalibrationState::Requested;
                Ok(())
            }
        }
    }

    /// Copies a completed measurement into `tuning`'s per-band noise floors
    /// and flips `use_per_band_noise_floor` on, then returns the procedure
    /// to `Idle` so a fresh `request()`/`start()` can run. Returns `false`
    /// (no-op, state untouched) if calibration hasn't completed yet.
    pub fn apply_to_tuning(&mut self, tuning: &crate::tuning::Tuning) -> bool {
        let Some(result) = &self.result else {
            return false;
        };
        let mut p = tuning.pipeline.read();
        p.per_band_noise_floors = result.band_floors;
        p.use_per_band_noise_floor = true;
        tuning.set_pipeline(p);
        self.state = CalibrationState::Idle;
        true
    }

    fn reset_accumulators(&mut self) {
        self.elapsed_ms = 0.0;
        self.band_sum = [0.0; NUM_BANDS];
        self.chroma_sum = [0.0; NUM_CHROMA];
        self.rms_sum = 0.0;
        self.peak_rms = 0.0;
        self.sample_count = 0;
        self.result = None;
    }

    pub fn reset(&mut self) {
        self.reset_accumulators();
        self.state = CalibrationState::Idle;
    }

    /// Feeds one hop's measurements through the calibration state machine.
    /// No-op outside `Requested`/`Measuring`.
    pub fn process(
        &mut self,
        bands: &[f32; NUM_BANDS],
        chroma: &[f32; NUM_CHROMA],
        rms: f32,
    ) -> Result<(), CalibrationError> {
        match self.state {
            CalibrationState::Requested => {
                self.state = CalibrationState::Measuring;
                self.accumulate(bands, chroma, rms)
            }
            CalibrationState::Measuring => self.accumulate(bands, chroma, rms),
            _ => Ok(()),
        }
    }

    fn accumulate(
        &mut self,
        bands: &[f32; NUM_BANDS],
        chroma: &[f32; NUM_CHROMA],
        rms: f32,
    ) -> Result<(), CalibrationError> {
        self.peak_rms = self.peak_rms.max(rms);
        if self.peak_rms > self.max_allowed_rms {
            self.state = CalibrationState::Failed;
            return Err(CalibrationError::TooLoud {
                peak_rms: self.peak_rms,
                max_allowed_rms: self.max_allowed_rms,
            });
        }

        for i in 0..NUM_BANDS {
            self.band_sum[i] += bands[i];
        }
        for i in 0..NUM_CHROMA {
            self.chroma_sum[i] += chroma[i];
        }
        self.rms_sum += rms;
        self.sample_count += 1;
        self.elapsed_ms += HOP_MS;

        if self.elapsed_ms >= self.duration_ms {
            self.complete();
        }

        Ok(())
    }

    fn complete(&mut self) {
        let n = self.sample_count.max(1) as f32;
        let mut band_floors = [0.0; NUM_BANDS];
        let mut chroma_floors = [0.0; NUM_CHROMA];
        for i in 0..NUM_BANDS {
            band_floors[i] = (self.band_sum[i] / n) * self.safety_multiplier;
        }
        for i in 0..NUM_CHROMA {
            chroma_floors[i] = (self.chroma_sum[i] / n) * self.safety_multiplier;
        }

        self.result = Some(NoiseCalibrationResult {
            band_floors,
            chroma_floors,
            overall_rms: self.rms_sum / n,
            peak_rms: self.peak_rms,
            sample_count: self.sample_count,
        });
        self.state = CalibrationState::Complete;
    }
}

impl Default for NoiseCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_request_while_already_in_progress() {
        let mut cal = NoiseCalibrator::new();
        cal.request().unwrap();
        assert!(matches!(cal.request(), Err(CalibrationError::AlreadyInProgress)));
    }

    #[test]
    fn completes_after_duration_with_averaged_floors() {
        let mut cal = NoiseCalibrator::new();
        cal.request().unwrap();
        let bands = [0.001; NUM_BANDS];
        let chroma = [0.0005; NUM_CHROMA];
        let hops_needed = (3000.0 / HOP_MS).ceil() as u32 + 1;
        for _ in 0..hops_needed {
            cal.process(&bands, &chroma, 0.001).unwrap();
        }
        assert_eq!(cal.state(), CalibrationState::Complete);
        let result = cal.result().unwrap();
        assert!((result.band_floors[0] - 0.0012).abs() < 1e-4);
    }

    #[test]
    fn loud_hop_aborts_as_failed() {
        let mut cal = NoiseCalibrator::new();
        cal.request().unwrap();
        let bands = [0.001; NUM_BANDS];
        let chroma = [0.0005; NUM_CHROMA];
        let err = cal.process(&bands, &chroma, 0.5).unwrap_err();
        assert!(matches!(err, CalibrationError::TooLoud { .. }));
        assert_eq!(cal.state(), CalibrationState::Failed);
    }

    #[test]
    fn reset_returns_to_idle_and_allows_new_request() {
        let mut cal = NoiseCalibrator::new();
        cal.request().unwrap();
        cal.reset();
        assert_eq!(cal.state(), CalibrationState::Idle);
        assert!(cal.request().is_ok());
    }

    #[test]
    fn start_honors_caller_supplied_duration_and_safety_margin() {
        let mut cal = NoiseCalibrator::new();
        cal.start(1000.0, 2.0).unwrap();
        let bands = [0.001; NUM_BANDS];
        let chroma = [0.0005; NUM_CHROMA];
        let hops_needed = (1000.0 / HOP_MS).ceil() as u32 + 1;
        for _ in 0..hops_needed {
            cal.process(&bands, &chroma, 0.001).unwrap();
        }
        assert_eq!(cal.state(), CalibrationState::Complete);
        let result = cal.result().unwrap();
        assert!((result.band_floors[0] - 0.002).abs() < 1e-4);
    }

    #[test]
    fn apply_to_tuning_is_noop_before_completion() {
        let mut cal = NoiseCalibrator::new();
        let tuning = crate::tuning::Tuning::new();
        assert!(!cal.apply_to_tuning(&tuning));
    }

    #[test]
    fn apply_to_tuning_writes_floors_and_returns_to_idle() {
        let mut cal = NoiseCalibrator::new();
        cal.request().unwrap();
        let bands = [0.002; NUM_BANDS];
        let chroma = [0.0005; NUM_CHROMA];
        let hops_needed = (3000.0 / HOP_MS).ceil() as u32 + 1;
        for _ in 0..hops_needed {
            cal.process(&bands, &chroma, 0.001).unwrap();
        }
        let tuning = crate::tuning::Tuning::new();
        assert!(cal.apply_to_tuning(&tuning));
        let applied = tuning.pipeline.read();
        assert!(applied.use_per_band_noise_floor);
        assert!((applied.per_band_noise_floors[0] - 0.0024).abs() < 1e-4);
        assert_eq!(cal.state(), CalibrationState::Idle);
        assert!(cal.request().is_ok());
    }
}
