//! Runtime-tunable parameters shared between AudioTask and RenderTask.
//!
//! `TuningPipeline` and `TuningContract` are each guarded by their own
//! `TuningSeqlock`; RenderTask writes (user gesture, preset switch,
//! calibration apply), AudioTask reads once per hop.

pub mod contract;
pub mod pipeline;
pub mod presets;
pub mod seqlock;

pub use contract::TuningContract;
pub use pipeline::TuningPipeline;
pub use presets::{get_preset, preset_name, AudioPreset};
pub use seqlock::TuningSeqlock;

/// Owns the live, seqlock-guarded tuning state for one engine instance.
pub struct Tuning {
    pub pipeline: TuningSeqlock<TuningPipeline>,
    pub contract: TuningSeqlock<TuningContract>,
}

impl Tuning {
    pub fn new() -> Self {
        Self {
            pipeline: TuningSeqlock::new(TuningPipeline::default()),
            contract: TuningSeqlock::new(TuningContract::default()),
        }
    }

    /// Applies a named preset, clamping is already done by `get_preset`.
    pub fn apply_preset(&self, preset: AudioPreset) {
        self.pipeline.write(get_preset(preset));
    }

    pub fn set_pipeline(&self, t: TuningPipeline) {
        self.pipeline.write(pipeline::clamp(t));
    }

    pub fn set_contract(&self, c: TuningContract) {
        self.contract.write(contract::clamp(c));
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::new()
    }
}
