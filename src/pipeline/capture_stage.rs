//! Capture stage: records fixed-duration segments and feeds the audio queue.

use crate::audio::source::{AudioSource, DeviceInfo};
use crate::pipeline::types::{snapshot, AudioSegment, SharedConfig, StatusLog};
use crossbeam_channel::{SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

pub(crate) struct CaptureStage {
    source: Box<dyn AudioSource>,
    audio_tx: Sender<AudioSegment>,
    config: SharedConfig,
    stop: Arc<AtomicBool>,
    log: StatusLog,
    applied_device: Option<DeviceInfo>,
    sequence: u64,
}

impl CaptureStage {
    pub(crate) fn new(
        source: Box<dyn AudioSource>,
        audio_tx: Sender<AudioSegment>,
        config: SharedConfig,
        stop: Arc<AtomicBool>,
        log: StatusLog,
    ) -> Self {
        Self {
            source,
            audio_tx,
            config,
            stop,
            log,
            applied_device: None,
            sequence: 0,
        }
    }

    /// Capture loop. One snapshot of the config per iteration, so device and
    /// segment-duration changes take effect at the next segment boundary.
    pub(crate) fn run(mut self) {
        while !self.stop.load(Ordering::Relaxed) {
            let config = snapshot(&self.config);

            if config.device != self.applied_device {
                self.apply_device(config.device.clone());
            }

            let samples = match self.source.capture(config.segment_duration) {
                Ok(samples) => samples,
                Err(err) => {
                    self.log.emit(format!("capture error: {err}"));
                    thread::sleep(config.capture_retry);
                    continue;
                }
            };

            if samples.is_empty() {
                // Silent or warming-up device; no segment to enqueue.
                thread::sleep(config.capture_retry);
                continue;
            }

            let segment = AudioSegment::new(samples, self.source.sample_rate(), self.sequence);
            self.sequence += 1;

            if !self.enqueue(segment, config.recv_timeout) {
                break;
            }
        }
    }

    fn apply_device(&mut self, device: Option<DeviceInfo>) {
        if let Some(ref device) = device {
            match self.source.select_device(device) {
                Ok(()) => self.log.emit(format!("capture device: {}", device.name)),
                Err(err) => {
                    // Keep recording on the previous device.
                    self.log.emit(format!("device switch failed: {err}"));
                    return;
                }
            }
        }
        self.applied_device = device;
    }

    /// Push a segment onto the bounded audio queue, polling the stop flag
    /// while the queue is full. Returns `false` when the stage should exit.
    fn enqueue(&self, segment: AudioSegment, timeout: std::time::Duration) -> bool {
        let mut segment = segment;
        loop {
            match self.audio_tx.send_timeout(segment, timeout) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(back)) => {
                    if self.stop.load(Ordering::Relaxed) {
                        return false;
                    }
                    segment = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }
}
