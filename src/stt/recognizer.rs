//! Speech recognition seam: the trait the recognition stage runs inference
//! through.

use crate::error::{PolyscribeError, Result};
use crate::pipeline::types::{AudioSegment, TextFragment};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for speech-to-text engines.
///
/// This trait allows swapping implementations (real Whisper vs mock).
/// `recognize` takes `&self` and must be callable from the recognition
/// worker thread, so implementations guard their internal state themselves.
pub trait Recognizer: Send + Sync {
    /// Transcribe one audio segment into ordered text fragments.
    ///
    /// An empty vector is a valid result: silence recognizes to nothing.
    fn recognize(&self, segment: &AudioSegment) -> Result<Vec<TextFragment>>;

    /// Name of the loaded model, for status lines.
    fn model_name(&self) -> &str;

    /// Whether the engine is loaded and able to recognize.
    fn is_ready(&self) -> bool;
}

impl<T: Recognizer + ?Sized> Recognizer for Arc<T> {
    fn recognize(&self, segment: &AudioSegment) -> Result<Vec<TextFragment>> {
        (**self).recognize(segment)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// One scripted outcome for [`MockRecognizer`].
enum MockOutcome {
    Fragments(Vec<TextFragment>),
    Failure(String),
}

/// Mock recognizer for testing.
///
/// Plays back a script of per-call outcomes, then returns empty results.
pub struct MockRecognizer {
    script: Mutex<VecDeque<MockOutcome>>,
    calls: AtomicU32,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue one successful recognition producing the given fragments.
    pub fn with_fragments(self, texts: &[&str]) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(MockOutcome::Fragments(
                texts.iter().copied().map(TextFragment::new).collect(),
            ));
        }
        self
    }

    /// Queue one failed recognition.
    pub fn with_failure(self, message: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(MockOutcome::Failure(message.to_string()));
        }
        self
    }

    /// Number of recognize calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for MockRecognizer {
    fn recognize(&self, _segment: &AudioSegment) -> Result<Vec<TextFragment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(MockOutcome::Fragments(fragments)) => Ok(fragments),
            Some(MockOutcome::Failure(message)) => {
                Err(PolyscribeError::Recognition { message })
            }
            // Script exhausted: silence.
            None => Ok(Vec::new()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> AudioSegment {
        AudioSegment::new(vec![0.0; 160], 16000, 0)
    }

    #[test]
    fn test_mock_plays_script_in_order() {
        let recognizer = MockRecognizer::new()
            .with_fragments(&["Hello world"])
            .with_fragments(&["Second", "segment"]);

        let first = recognizer.recognize(&segment()).unwrap();
        assert_eq!(first, vec![TextFragment::new("Hello world")]);

        let second = recognizer.recognize(&segment()).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[1].text, "segment");
        assert_eq!(recognizer.calls(), 2);
    }

    #[test]
    fn test_mock_failure_then_recovery() {
        let recognizer = MockRecognizer::new()
            .with_failure("inference failed")
            .with_fragments(&["after the error"]);

        let first = recognizer.recognize(&segment());
        assert!(matches!(
            first,
            Err(PolyscribeError::Recognition { message }) if message == "inference failed"
        ));

        let second = recognizer.recognize(&segment()).unwrap();
        assert_eq!(second[0].text, "after the error");
    }

    #[test]
    fn test_mock_returns_silence_after_script() {
        let recognizer = MockRecognizer::new();
        assert!(recognizer.recognize(&segment()).unwrap().is_empty());
    }

    #[test]
    fn test_recognizer_through_arc() {
        let recognizer = Arc::new(MockRecognizer::new().with_fragments(&["shared"]));
        let result = recognizer.recognize(&segment()).unwrap();
        assert_eq!(result[0].text, "shared");
    }
}
