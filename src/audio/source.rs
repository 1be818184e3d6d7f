//! Audio capture seam: the trait the capture stage records through.

use crate::defaults;
use crate::error::{PolyscribeError, Result};
use std::collections::VecDeque;
use std::time::Duration;

/// Identity of a capture device, as shown to the user and stored in config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
}

impl DeviceInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Trait for audio capture devices.
///
/// This trait allows swapping implementations (real microphone vs mock).
/// A capture call records one whole segment and blocks until it is complete;
/// it is not preemptible, so callers must bound segment duration themselves.
pub trait AudioSource: Send {
    /// Record one segment of the given duration.
    ///
    /// # Returns
    /// Mono f32 samples at `sample_rate()`, or an error. An empty vector
    /// means the device produced nothing (e.g. still warming up) and the
    /// caller should retry.
    fn capture(&mut self, duration: Duration) -> Result<Vec<f32>>;

    /// Sample rate of the captured audio in Hz.
    fn sample_rate(&self) -> u32 {
        defaults::SAMPLE_RATE
    }

    /// Enumerate available input devices.
    fn list_input_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Switch capture to the given device, effective on the next capture.
    fn select_device(&mut self, device: &DeviceInfo) -> Result<()>;
}

/// Mock audio source for testing.
///
/// Plays back a script of capture outcomes, then returns empty captures.
/// Segments can also be fed while the pipeline is running via the handle
/// returned by [`MockAudioSource::feeder`].
pub struct MockAudioSource {
    script: std::sync::Arc<std::sync::Mutex<VecDeque<Result<Vec<f32>>>>>,
    devices: Vec<DeviceInfo>,
    selected: Option<DeviceInfo>,
    should_fail_select: bool,
    captures: u32,
}

/// Handle for pushing segments into a running [`MockAudioSource`].
#[derive(Clone)]
pub struct SegmentFeeder {
    script: std::sync::Arc<std::sync::Mutex<VecDeque<Result<Vec<f32>>>>>,
}

impl SegmentFeeder {
    /// Queue one successful capture.
    pub fn feed(&self, samples: Vec<f32>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(samples));
        }
    }

    /// Queue one failed capture.
    pub fn feed_error(&self, message: &str) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(PolyscribeError::Capture {
                message: message.to_string(),
            }));
        }
    }
}

impl MockAudioSource {
    /// Create a mock source with an empty script.
    pub fn new() -> Self {
        Self {
            script: std::sync::Arc::new(std::sync::Mutex::new(VecDeque::new())),
            devices: vec![DeviceInfo::new("mock microphone")],
            selected: None,
            should_fail_select: false,
            captures: 0,
        }
    }

    /// Queue segments returned by successive captures, in order.
    pub fn with_segments(self, segments: Vec<Vec<f32>>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            for samples in segments {
                script.push_back(Ok(samples));
            }
        }
        self
    }

    /// Queue one failed capture.
    pub fn with_capture_failure(self, message: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(PolyscribeError::Capture {
                message: message.to_string(),
            }));
        }
        self
    }

    /// Configure the device list returned by enumeration.
    pub fn with_devices(mut self, names: &[&str]) -> Self {
        self.devices = names.iter().map(|n| DeviceInfo::new(n)).collect();
        self
    }

    /// Configure `select_device` to fail.
    pub fn with_select_failure(mut self) -> Self {
        self.should_fail_select = true;
        self
    }

    /// Handle for feeding segments after the source has been moved into the
    /// pipeline.
    pub fn feeder(&self) -> SegmentFeeder {
        SegmentFeeder {
            script: self.script.clone(),
        }
    }

    /// Number of capture calls made so far.
    pub fn captures(&self) -> u32 {
        self.captures
    }

    /// The device currently selected, if any.
    pub fn selected_device(&self) -> Option<&DeviceInfo> {
        self.selected.as_ref()
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn capture(&mut self, _duration: Duration) -> Result<Vec<f32>> {
        self.captures += 1;
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(outcome) => outcome,
            // Script exhausted: behave like a silent device.
            None => Ok(Vec::new()),
        }
    }

    fn list_input_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.clone())
    }

    fn select_device(&mut self, device: &DeviceInfo) -> Result<()> {
        if self.should_fail_select {
            return Err(PolyscribeError::AudioDeviceNotFound {
                device: device.name.clone(),
            });
        }
        if !self.devices.contains(device) {
            return Err(PolyscribeError::AudioDeviceNotFound {
                device: device.name.clone(),
            });
        }
        self.selected = Some(device.clone());
        Ok(())
    }
}
