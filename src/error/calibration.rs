use crate::error::ErrorCode;
use std::fmt;

/// Error code range: 2000-2002.
pub struct CalibrationErrorCodes;

impl CalibrationErrorCodes {
    pub const TOO_LOUD: i32 = 2000;
    pub const ALREADY_IN_PROGRESS: i32 = 2001;
    pub const NOT_COMPLETE: i32 = 2002;
}

/// Errors from `NoiseCalibrator`. A `TooLoud` abort leaves previous floor
/// values untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    TooLoud { peak_rms: f32, max_allowed_rms: f32 },
    AlreadyInProgress,
    NotComplete,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::TooLoud { .. } => CalibrationErrorCodes::TOO_LOUD,
            CalibrationError::AlreadyInProgress => CalibrationErrorCodes::ALREADY_IN_PROGRESS,
            CalibrationError::NotComplete => CalibrationErrorCodes::NOT_COMPLETE,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::TooLoud { peak_rms, max_allowed_rms } => format!(
                "peak rms {peak_rms} exceeded max_allowed_rms {max_allowed_rms} during calibration"
            ),
            CalibrationError::AlreadyInProgress => "calibration already in progress".to_string(),
            CalibrationError::NotComplete => "calibration has not completed".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalibrationError::{:?} (code {}): {}", self, self.code(), self.message())
    }
}

impl std::error::Error for CalibrationError {}
