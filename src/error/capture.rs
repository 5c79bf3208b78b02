use crate::error::ErrorCode;
use std::fmt;

/// Error code range: 1100-1102.
pub struct CaptureErrorCodes;

impl CaptureErrorCodes {
    pub const DMA_TIMEOUT: i32 = 1100;
    pub const READ_ERROR: i32 = 1101;
    pub const NOT_INITIALIZED: i32 = 1102;
}

/// Non-fatal per-hop capture failures. AudioTask counts these and continues;
/// see `AudioSource::capture_hop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    DmaTimeout,
    ReadError,
    NotInitialized,
}

impl ErrorCode for CaptureError {
    fn code(&self) -> i32 {
        match self {
            CaptureError::DmaTimeout => CaptureErrorCodes::DMA_TIMEOUT,
            CaptureError::ReadError => CaptureErrorCodes::READ_ERROR,
            CaptureError::NotInitialized => CaptureErrorCodes::NOT_INITIALIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            CaptureError::DmaTimeout => "DMA read timed out".to_string(),
            CaptureError::ReadError => "capture read failed".to_string(),
            CaptureError::NotInitialized => "capture_hop called before init()".to_string(),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureError::{:?} (code {}): {}", self, self.code(), self.message())
    }
}

impl std::error::Error for CaptureError {}
