//! lumacore: realtime audio analysis and musical-time core for LED control
//! pipelines.
//!
//! This crate owns the hard realtime part -- capture, DSP, tempo tracking,
//! and the lock-free cross-core handoff -- and nothing about LED rendering,
//! palettes, or effects. See `engine::core::AudioCore` for the entry point
//! that wires every stage together.

pub mod audio;
pub mod calibration;
pub mod config_store;
pub mod control_bus;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod telemetry;
pub mod tempo;
#[cfg(any(test, feature = "diagnostics_fixtures"))]
pub mod testing;
pub mod time;
pub mod tuning;

/// Initializes the `env_logger` backend used by binaries and tests. Library
/// code logs through the `log` facade and never calls this itself.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
