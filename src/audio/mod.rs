//! Audio capture.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod source;

#[cfg(feature = "cpal-audio")]
pub use capture::CpalAudioSource;
pub use source::{AudioSource, DeviceInfo, MockAudioSource, SegmentFeeder};
