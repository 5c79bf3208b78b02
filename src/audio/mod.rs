//! Capture-side audio sources.

pub mod source;

pub use source::{AudioSource, CaptureStats, CpalAudioSource, SyntheticAudioSource};
