//! Default configuration constants for polyscribe.
//!
//! Shared across the file config, the runtime pipeline config, and the CLI
//! so the same numbers are never duplicated in three places.

use std::time::Duration;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and matches what Whisper
/// models expect as input.
pub const SAMPLE_RATE: u32 = 16000;

/// Default duration of one captured audio segment.
///
/// Each segment is recorded as a whole and then recognized as a whole, so
/// this is also the worst-case stop latency of the capture stage.
pub const SEGMENT_DURATION: Duration = Duration::from_secs(5);

/// Default delay between characters on the output channels.
///
/// Emulates live typing in the presentation layer. Set to zero to deliver
/// fragments as fast as the consumer can drain them.
pub const CHAR_DELAY: Duration = Duration::from_millis(30);

/// Queue receive timeout for the recognition and translation stages.
///
/// Bounds how long an idle stage can go without re-checking the stop flag.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Delay before retrying after a failed or empty capture.
pub const CAPTURE_RETRY: Duration = Duration::from_millis(100);

/// Depth of the audio segment queue between capture and recognition.
pub const AUDIO_QUEUE_DEPTH: usize = 8;

/// Depth of the fragment queue between recognition and translation.
pub const FRAGMENT_QUEUE_DEPTH: usize = 32;

/// How long `start()` waits for a previous generation of workers to drain
/// before refusing to spawn a new one.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

/// Default Whisper model name.
///
/// "base.en" because the pipeline's source language is fixed to English;
/// multilingual variants work but waste memory on unused languages.
pub const DEFAULT_MODEL: &str = "base.en";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_timeout_shorter_than_segment() {
        // Stages must observe the stop flag well within one segment.
        assert!(RECV_TIMEOUT < SEGMENT_DURATION);
    }

    #[test]
    fn char_delay_is_nonzero_by_default() {
        assert!(!CHAR_DELAY.is_zero());
    }
}
