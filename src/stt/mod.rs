//! Speech-to-text.

pub mod recognizer;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use recognizer::{MockRecognizer, Recognizer};
#[cfg(feature = "whisper")]
pub use whisper::WhisperRecognizer;
