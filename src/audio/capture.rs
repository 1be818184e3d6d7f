//! Real audio capture using CPAL (Cross-Platform Audio Library).
//!
//! # Feature Gate
//!
//! Requires the `cpal-audio` feature and ALSA headers on Linux.

use crate::audio::source::{AudioSource, DeviceInfo};
use crate::defaults;
use crate::error::{PolyscribeError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA error messages that occur during audio backend probing.
/// These are harmless but confusing to users.
///
/// # Safety
/// This modifies environment variables which is safe when called before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if a device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Check if a device is a preferred device (PipeWire/PulseAudio bridge).
pub fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
///
/// This ensures we respect the desktop's audio device selection.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| PolyscribeError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Find an input device by exact name.
fn find_device(name: &str) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| PolyscribeError::Capture {
                message: format!("Failed to enumerate devices: {}", e),
            })?;

        for device in devices {
            if let Ok(dev_name) = device.name()
                && dev_name == name
            {
                return Ok(device);
            }
        }

        Err(PolyscribeError::AudioDeviceNotFound {
            device: name.to_string(),
        })
    })
}

/// Mix multi-channel audio to mono and resample to the target rate.
fn convert_to_mono(samples: &[f32], channels: usize, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let mono: Vec<f32> = if channels <= 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if source_rate == target_rate || source_rate == 0 {
        return mono;
    }

    // Linear interpolation; sufficient quality for speech input.
    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = (mono.len() as f64 / ratio) as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        let a = mono[idx.min(mono.len() - 1)];
        let b = mono[(idx + 1).min(mono.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is created, played, and dropped on the capture worker
/// thread only; it never crosses thread boundaries while live.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real audio capture implementation using CPAL.
///
/// Captures f32 mono audio at 16kHz, as required by Whisper. Tries the
/// preferred format first (f32/16kHz/mono), then i16 with conversion, then
/// the device's default config with software channel mixing and resampling.
pub struct CpalAudioSource {
    device: cpal::Device,
    buffer: Arc<Mutex<Vec<f32>>>,
    callback_count: Arc<AtomicU64>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Create a new CPAL audio source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best
    ///   default input device.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = match device_name {
            Some(name) => find_device(name)?,
            None => get_best_default_device()?,
        };

        Ok(Self {
            device,
            buffer: Arc::new(Mutex::new(Vec::new())),
            callback_count: Arc::new(AtomicU64::new(0)),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    /// Build the audio stream with the configured format.
    ///
    /// Tries in order:
    /// 1. f32/16kHz/mono — preferred, zero-copy path
    /// 2. i16/16kHz/mono — for devices that only expose integer formats
    /// 3. Device default config — native rate/channels with software conversion
    ///
    /// Step 3 handles PipeWire setups where the ALSA compatibility layer
    /// accepts non-native configs but never fires the data callback.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("Audio stream error: {}", err);
        };

        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend(data.iter().map(|&s| s as f32 / 32768.0));
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        self.build_stream_native()
    }

    /// Build a stream using the device's default/native config, with software
    /// channel mixing (stereo→mono) and resampling (native rate→16kHz).
    fn build_stream_native(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| PolyscribeError::Capture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;

        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let err_callback = |err| {
            eprintln!("Audio stream error: {}", err);
        };

        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);

        match default_config.sample_format() {
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let converted =
                            convert_to_mono(data, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| PolyscribeError::Capture {
                    message: format!("Failed to build native f32 stream: {}", e),
                }),
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let f32_data: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 32768.0).collect();
                        let converted =
                            convert_to_mono(&f32_data, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| PolyscribeError::Capture {
                    message: format!("Failed to build native i16 stream: {}", e),
                }),
            fmt => Err(PolyscribeError::Capture {
                message: format!(
                    "Unsupported native sample format: {:?}. \
                     Try selecting a different device.",
                    fmt
                ),
            }),
        }
    }

    fn drain_buffer(&self) -> Result<Vec<f32>> {
        let mut buffer = self.buffer.lock().map_err(|e| PolyscribeError::Capture {
            message: format!("Failed to lock audio buffer: {}", e),
        })?;
        Ok(std::mem::take(&mut *buffer))
    }
}

/// How long to wait before deciding a stream's data callback never fires.
const CALLBACK_PROBE: Duration = Duration::from_millis(200);

impl AudioSource for CpalAudioSource {
    /// Record one segment by running a stream for `duration`, then draining
    /// the accumulated samples.
    fn capture(&mut self, duration: Duration) -> Result<Vec<f32>> {
        self.drain_buffer()?;
        self.callback_count.store(0, Ordering::Relaxed);

        let stream = self.build_stream()?;
        stream.play().map_err(|e| PolyscribeError::Capture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        // Probe that the callback actually fires; some PipeWire-ALSA setups
        // accept non-native configs but never deliver data.
        let probe = duration.min(CALLBACK_PROBE);
        std::thread::sleep(probe);

        let stream = if self.callback_count.load(Ordering::Relaxed) == 0 {
            drop(stream);
            self.drain_buffer()?;

            let native = SendableStream(self.build_stream_native()?);
            native.0.play().map_err(|e| PolyscribeError::Capture {
                message: format!("Failed to start native audio stream: {}", e),
            })?;
            native
        } else {
            SendableStream(stream)
        };

        if duration > probe {
            std::thread::sleep(duration - probe);
        }
        drop(stream);

        self.drain_buffer()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn list_input_devices(&self) -> Result<Vec<DeviceInfo>> {
        let devices = with_suppressed_stderr(|| {
            let host = cpal::default_host();
            host.input_devices()
        })
        .map_err(|e| PolyscribeError::Capture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

        let mut infos = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                if should_filter_device(&name) {
                    continue;
                }
                infos.push(DeviceInfo::new(&name));
            }
        }

        Ok(infos)
    }

    fn select_device(&mut self, device: &DeviceInfo) -> Result<()> {
        self.device = find_device(&device.name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_filter_device() {
        assert!(should_filter_device("surround51"));
        assert!(should_filter_device("front:CARD=PCH"));
        assert!(should_filter_device("HDMI Output"));
        assert!(should_filter_device("Digital Output S/PDIF"));
        assert!(!should_filter_device("pipewire"));
        assert!(!should_filter_device("PulseAudio"));
        assert!(!should_filter_device("Built-in Audio"));
    }

    #[test]
    fn test_is_preferred_device() {
        assert!(is_preferred_device("pipewire"));
        assert!(is_preferred_device("PipeWire"));
        assert!(is_preferred_device("pulse"));
        assert!(is_preferred_device("PulseAudio"));
        assert!(!is_preferred_device("hw:0,0"));
        assert!(!is_preferred_device("default"));
    }

    #[test]
    fn test_convert_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(convert_to_mono(&samples, 1, 16000, 16000), samples);
    }

    #[test]
    fn test_convert_stereo_averages_channels() {
        let samples = vec![0.2, 0.4, -0.2, -0.4];
        let mono = convert_to_mono(&samples, 2, 16000, 16000);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_convert_downsamples() {
        let samples = vec![0.0; 48000];
        let mono = convert_to_mono(&samples, 1, 48000, 16000);
        assert_eq!(mono.len(), 16000);
    }

    #[test]
    fn test_create_with_invalid_device_name() {
        let source = CpalAudioSource::new(Some("NonExistentDevice12345"));
        match source {
            Err(PolyscribeError::AudioDeviceNotFound { device }) => {
                assert_eq!(device, "NonExistentDevice12345");
            }
            Err(PolyscribeError::Capture { .. }) => {
                // No audio backend available at all (headless CI).
            }
            _ => panic!("Expected device lookup to fail"),
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_list_devices_returns_at_least_one_device() {
        let source = CpalAudioSource::new(None).expect("Failed to create audio source");
        let devices = source.list_input_devices().expect("Failed to list devices");
        assert!(!devices.is_empty(), "Expected at least one audio device");
        for device in &devices {
            assert!(!device.name.to_lowercase().contains("surround"));
            assert!(!device.name.to_lowercase().contains("hdmi"));
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_capture_short_segment() {
        let mut source = CpalAudioSource::new(None).expect("Failed to create audio source");
        let samples = source
            .capture(Duration::from_millis(300))
            .expect("Failed to capture");
        println!("Captured {} samples", samples.len());
    }
}
