//! Seqlock-protected tuning handoff: RenderTask writes, AudioTask reads.
//!
//! This is the mirror of `snapshot::SnapshotBuffer` -- same single-slot
//! seqlock mechanism, opposite direction of flow. Tuning changes are rare
//! (user-driven) compared to the once-per-hop `ControlBusFrame` publish, so
//! a single retry on overlap is more than adequate.

use crate::snapshot::SnapshotBuffer;

/// Seqlock-guarded value mutable from RenderTask and read from AudioTask
/// once per hop.
pub struct TuningSeqlock<T: Copy> {
    inner: SnapshotBuffer<T>,
}

impl<T: Copy> TuningSeqlock<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: SnapshotBuffer::with_initial(initial),
        }
    }

    /// RenderTask-only. Must never be called concurrently from more than
    /// one thread.
    pub fn write(&self, value: T) {
        self.inner.publish(value);
    }

    /// AudioTask-only. Returns the latest committed value.
    pub fn read(&self) -> T {
        self.inner.read()
    }

    pub fn version(&self) -> u32 {
        self.inner.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::contract::TuningContract;
    use crate::tuning::pipeline::TuningPipeline;

    #[test]
    fn pipeline_round_trips() {
        let lock = TuningSeqlock::new(TuningPipeline::default());
        let mut t = TuningPipeline::default();
        t.agc_target_rms = 0.4;
        lock.write(t);
        assert_eq!(lock.read().agc_target_rms, 0.4);
    }

    #[test]
    fn contract_round_trips_and_versions_advance() {
        let lock = TuningSeqlock::new(TuningContract::default());
        assert_eq!(lock.version(), 0);
        let mut c = TuningContract::default();
        c.bpm_min = 60.0;
        lock.write(c);
        assert_eq!(lock.version(), 1);
        assert_eq!(lock.read().bpm_min, 60.0);
    }
}
