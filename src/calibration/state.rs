//! Noise-calibration state machine and its result payload.

use serde::{Deserialize, Serialize};

pub const NUM_BANDS: usize = 8;
pub const NUM_CHROMA: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationState {
    Idle,
    Requested,
    Measuring,
    Complete,
    Failed,
}

impl Default for CalibrationState {
    fn default() -> Self {
        CalibrationState::Idle
    }
}

/// Measured noise floors, ready to be written into `TuningPipeline` or
/// handed to a `ConfigStore` for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseCalibrationResult {
    pub band_floors: [f32; NUM_BANDS],
    pub chroma_floors: [f32; NUM_CHROMA],
    pub overall_rms: f32,
    pub peak_rms: f32,
    pub sample_count: u32,
}

impl Default for NoiseCalibrationResult {
    fn default() -> Self {
        Self {
            band_floors: [0.0; NUM_BANDS],
            chroma_floors: [0.0; NUM_CHROMA],
            overall_rms: 0.0,
            peak_rms: 0.0,
            sample_count: 0,
        }
    }
}
