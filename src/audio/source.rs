//! `AudioSource`: the capture-side contract AudioTask pulls hops from.
//!
//! Hardware I2S/codec bring-up lives outside this crate; this module only
//! defines the trait plus a `cpal`-backed desktop implementation (useful for
//! development/diagnostics) and a synthetic source for tests and fixtures.

use crate::error::{CaptureError, InitError};
use crate::time::HOP_SIZE;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CaptureStats {
    pub frames_captured: u64,
    pub dma_timeouts: u64,
    pub overflow_count: u64,
    /// Non-timeout capture failures (distinct from `dma_timeouts`); three
    /// consecutive failures trigger AudioTask's blind re-init policy.
    pub read_errors: u64,
    /// Coarse per-hop read latency, microseconds. Zero for sources (like
    /// `SyntheticAudioSource`) with no real I/O to time.
    pub max_read_us: u32,
    pub avg_read_us: u32,
    /// Largest-magnitude sample observed across all captured hops.
    pub peak_sample: i16,
}

/// A hop-granular PCM source. `capture_hop` blocks (briefly) until exactly
/// `HOP_SIZE` samples are available or the source gives up and reports a
/// timeout.
pub trait AudioSource {
    fn init(&mut self) -> Result<(), InitError>;

    fn capture_hop(&mut self, out: &mut [i16; HOP_SIZE]) -> Result<(), CaptureError>;

    fn stats(&self) -> CaptureStats;

    /// Optional hardware mic-gain trim; a no-op for sources without one.
    fn set_mic_gain_db(&mut self, _db: f32) {}
}

/// Deterministic source for tests: replays a fixed sample buffer, looping
/// or padding with silence, and never fails.
pub struct SyntheticAudioSource {
    samples: Vec<i16>,
    cursor: usize,
    loop_samples: bool,
    stats: CaptureStats,
}

impl SyntheticAudioSource {
    pub fn new(samples: Vec<i16>, loop_samples: bool) -> Self {
        Self {
            samples,
            cursor: 0,
            loop_samples,
            stats: CaptureStats::default(),
        }
    }

    pub fn silence(num_hops: usize) -> Self {
        Self::new(vec![0i16; num_hops * HOP_SIZE], false)
    }
}

impl AudioSource for SyntheticAudioSource {
    fn init(&mut self) -> Result<(), InitError> {
        Ok(())
    }

    fn capture_hop(&mut self, out: &mut [i16; HOP_SIZE]) -> Result<(), CaptureError> {
        for slot in out.iter_mut() {
            if self.cursor >= self.samples.len() {
                if self.loop_samples && !self.samples.is_empty() {
                    self.cursor = 0;
                } else {
                    *slot = 0;
                    continue;
                }
            }
            *slot = self.samples.get(self.cursor).copied().unwrap_or(0);
            self.cursor += 1;
        }
        self.stats.frames_captured += HOP_SIZE as u64;
        for &s in out.iter() {
            self.stats.peak_sample = self.stats.peak_sample.max(s.abs());
        }
        Ok(())
    }

    fn stats(&self) -> CaptureStats {
        self.stats
    }
}

pub use desktop::CpalAudioSource;

mod desktop {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    const RING_CAPACITY: usize = HOP_SIZE * 8;

    /// Desktop development/diagnostic source backed by the system default
    /// input device. Converts the device's native format down to i16 mono
    /// and hands samples to AudioTask through an `rtrb` ring buffer, the
    /// same handoff shape used for the realtime hop pipeline elsewhere in
    /// this crate.
    pub struct CpalAudioSource {
        stream: Option<cpal::Stream>,
        consumer: Option<rtrb::Consumer<i16>>,
        frames_captured: Arc<AtomicU64>,
        dma_timeouts: u64,
        overflow_count: Arc<AtomicU64>,
        peak_sample: i16,
        max_read_us: u32,
        total_read_us: u64,
        reads: u64,
    }

    impl CpalAudioSource {
        pub fn new() -> Self {
            Self {
                stream: None,
                consumer: None,
                frames_captured: Arc::new(AtomicU64::new(0)),
                dma_timeouts: 0,
                overflow_count: Arc::new(AtomicU64::new(0)),
                peak_sample: 0,
                max_read_us: 0,
                total_read_us: 0,
                reads: 0,
            }
        }
    }

    impl Default for CpalAudioSource {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioSource for CpalAudioSource {
        fn init(&mut self) -> Result<(), InitError> {
            let host = cpal::default_host();
            let device = host.default_input_device().ok_or_else(|| InitError::Codec {
                details: "no default input device found".to_string(),
            })?;
            let config = device.default_input_config().map_err(|e| InitError::Codec {
                details: format!("failed to get default input config: {e:?}"),
            })?;

            let stream_config: cpal::StreamConfig = config.clone().into();
            let channels = stream_config.channels as usize;

            let (mut producer, consumer) = rtrb::RingBuffer::<i16>::new(RING_CAPACITY);
            let overflow_count = Arc::clone(&self.overflow_count);
            let frames_captured = Arc::clone(&self.frames_captured);

            let err_fn = |err| log::error!("capture stream error: {err}");

            let stream = match config.sample_format() {
                cpal::SampleFormat::F32 => device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            for frame in data.chunks(channels.max(1)) {
                                let sample = frame.first().copied().unwrap_or(0.0);
                                let quantized = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                                if producer.push(quantized).is_err() {
                                    overflow_count.fetch_add(1, Ordering::Relaxed);
                                } else {
                                    frames_captured.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        },
                        err_fn,
                        None,
                    )
                    .map_err(|e| InitError::Bus {
                        details: format!("{e:?}"),
                    })?,
                other => {
                    return Err(InitError::Codec {
                        details: format!("unsupported input sample format: {other:?}"),
                    })
                }
            };

            stream.play().map_err(|e| InitError::Bus {
                details: format!("failed to start input stream: {e:?}"),
            })?;

            self.stream = Some(stream);
            self.consumer = Some(consumer);
            Ok(())
        }

        fn capture_hop(&mut self, out: &mut [i16; HOP_SIZE]) -> Result<(), CaptureError> {
            let started = std::time::Instant::now();
            let consumer = self.consumer.as_mut().ok_or(CaptureError::NotInitialized)?;

            const MAX_SPINS: u32 = 2000;
            let mut filled = 0;
            let mut spins = 0;
            while filled < HOP_SIZE {
                match consumer.pop() {
                    Ok(sample) => {
                        out[filled] = sample;
                        filled += 1;
                    }
                    Err(_) => {
                        spins += 1;
                        if spins >= MAX_SPINS {
                            self.dma_timeouts += 1;
                            return Err(CaptureError::DmaTimeout);
                        }
                        std::hint::spin_loop();
                    }
                }
            }

            for &s in out.iter() {
                self.peak_sample = self.peak_sample.max(s.abs());
            }
            let elapsed_us = started.elapsed().as_micros().min(u32::MAX as u128) as u32;
            self.max_read_us = self.max_read_us.max(elapsed_us);
            self.total_read_us += elapsed_us as u64;
            self.reads += 1;

            Ok(())
        }

        fn stats(&self) -> CaptureStats {
            CaptureStats {
                frames_captured: self.frames_captured.load(Ordering::Relaxed),
                dma_timeouts: self.dma_timeouts,
                overflow_count: self.overflow_count.load(Ordering::Relaxed),
                read_errors: 0,
                max_read_us: self.max_read_us,
                avg_read_us: (self.total_read_us / self.reads.max(1)) as u32,
                peak_sample: self.peak_sample,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_replays_samples_exactly() {
        let samples: Vec<i16> = (0..HOP_SIZE as i16).collect();
        let mut source = SyntheticAudioSource::new(samples.clone(), false);
        let mut hop = [0i16; HOP_SIZE];
        source.capture_hop(&mut hop).unwrap();
        assert_eq!(&hop[..], &samples[..]);
    }

    #[test]
    fn synthetic_source_pads_with_silence_when_exhausted() {
        let mut source = SyntheticAudioSource::new(vec![1, 2, 3], false);
        let mut hop = [0i16; HOP_SIZE];
        source.capture_hop(&mut hop).unwrap();
        assert_eq!(&hop[..3], &[1, 2, 3]);
        assert!(hop[3..].iter().all(|&s| s == 0));
    }

    #[test]
    fn synthetic_source_loops_when_requested() {
        let mut source = SyntheticAudioSource::new(vec![7, 8], true);
        let mut hop = [0i16; HOP_SIZE];
        source.capture_hop(&mut hop).unwrap();
        assert_eq!(hop[0], 7);
        assert_eq!(hop[1], 8);
        assert_eq!(hop[2], 7);
    }

    #[test]
    fn stats_track_frames_captured() {
        let mut source = SyntheticAudioSource::silence(4);
        let mut hop = [0i16; HOP_SIZE];
        source.capture_hop(&mut hop).unwrap();
        assert_eq!(source.stats().frames_captured, HOP_SIZE as u64);
    }
}
