//! AudioTask: the dedicated OS thread that pulls hops through `AudioCore`.
//!
//! Runs on its own `std::thread`, never a tokio task -- see `engine::core`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::core::AudioCore;

/// Spawns the realtime capture/DSP loop on a dedicated OS thread. The
/// returned handle's thread exits once `stop` is observed true.
pub fn spawn(mut core: AudioCore, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("audio-task".to_string())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if let Err(err) = core.run_hop() {
                    log::warn!("audio hop failed: {err}");
                }
            }
        })
        .expect("failed to spawn audio-task thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SyntheticAudioSource;
    use crate::control_bus::ControlBusFrame;
    use crate::snapshot::SnapshotBuffer;
    use crate::tuning::Tuning;
    use std::time::Duration;

    #[test]
    fn audio_task_publishes_frames_and_stops_cleanly() {
        let source = Box::new(SyntheticAudioSource::silence(64));
        let tuning = Arc::new(Tuning::new());
        let snapshot = Arc::new(SnapshotBuffer::<ControlBusFrame>::new());
        let mut core = AudioCore::new(source, tuning, snapshot.clone());
        core.init().unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn(core, stop.clone());

        thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        assert!(snapshot.read().hop_seq > 0);
    }
}
