//! Per-hop DSP stages: DC removal, AGC, noise-floor tracking, spectral
//! analysis, chroma folding, and novelty flux.

pub mod agc;
pub mod chroma;
pub mod dc_blocker;
pub mod fft_cross_check;
pub mod goertzel;
pub mod noise_floor;
pub mod novelty;

pub use agc::Agc;
pub use chroma::ChromaAnalyzer;
pub use dc_blocker::DcBlocker;
pub use fft_cross_check::FftCrossCheck;
pub use goertzel::{GoertzelAnalyzer, GoertzelBins64};
pub use noise_floor::NoiseFloor;
pub use novelty::NoveltyFlux;

/// Full-scale divisor for i16 PCM, used everywhere a hop is normalized to
/// `[-1, 1]` before DSP.
pub const FULL_SCALE: f32 = 32768.0;
