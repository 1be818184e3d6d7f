//! Data types shared across the streaming pipeline.

use crate::audio::source::DeviceInfo;
use crate::defaults;
use crate::lang::TargetLanguage;
use crossbeam_channel::Sender;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// One fixed-duration buffer of captured audio.
///
/// Immutable once captured; ownership moves from the capture stage to the
/// recognition stage through the audio queue and is dropped after
/// recognition.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Mono samples, normalized f32.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Sequence number for ordering and log lines.
    pub sequence: u64,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32, sequence: u64) -> Self {
        Self {
            samples,
            sample_rate,
            sequence,
        }
    }

    /// Duration of the buffered audio.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// One recognized unit of speech.
///
/// The source language is implicit: whatever the recognizer outputs.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    pub text: String,
}

impl TextFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Runtime pipeline configuration.
///
/// Shared between the control thread (writer) and the stage workers
/// (readers). Workers take a full clone snapshot once per work item, so a
/// change applies to the next segment/fragment, never mid-flight and never
/// retroactively.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Duration of each captured audio segment.
    pub segment_duration: Duration,
    /// Language for the translated-text channel. `En` disables translation.
    pub target_language: TargetLanguage,
    /// Capture device; `None` means the source's default.
    pub device: Option<DeviceInfo>,
    /// Delay between characters on the output channels.
    pub char_delay: Duration,
    /// Queue receive timeout (stop-flag polling interval for idle stages).
    pub recv_timeout: Duration,
    /// Delay before retrying a failed or empty capture.
    pub capture_retry: Duration,
    /// Depth of the audio segment queue.
    pub audio_buffer: usize,
    /// Depth of the fragment queue.
    pub fragment_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segment_duration: defaults::SEGMENT_DURATION,
            target_language: TargetLanguage::default(),
            device: None,
            char_delay: defaults::CHAR_DELAY,
            recv_timeout: defaults::RECV_TIMEOUT,
            capture_retry: defaults::CAPTURE_RETRY,
            audio_buffer: defaults::AUDIO_QUEUE_DEPTH,
            fragment_buffer: defaults::FRAGMENT_QUEUE_DEPTH,
        }
    }
}

/// Shared handle to the live pipeline configuration.
pub type SharedConfig = Arc<RwLock<PipelineConfig>>;

/// Take a consistent snapshot of the shared configuration.
///
/// A poisoned lock still yields the last written value; configuration reads
/// must never take a stage down.
pub fn snapshot(config: &SharedConfig) -> PipelineConfig {
    match config.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Lifecycle of the pipeline as a whole.
///
/// `Stopping` persists until the controller has confirmed that all workers
/// exited; only then does it transition back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Running,
    Stopping,
}

/// Handle for emitting log/status lines from a stage.
///
/// Fire-and-forget: a full or disconnected channel drops the message rather
/// than blocking or failing the stage.
#[derive(Clone)]
pub struct StatusLog {
    tx: Sender<String>,
}

impl StatusLog {
    pub(crate) fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }

    /// Emit one status line.
    pub fn emit(&self, message: impl Into<String>) {
        self.tx.try_send(message.into()).ok();
    }
}
