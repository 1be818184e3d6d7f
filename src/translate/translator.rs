//! Translation seam: the trait the translation stage calls per fragment.

use crate::error::{PolyscribeError, Result};
use crate::lang::TargetLanguage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for text translation engines.
///
/// This trait allows swapping implementations (real model vs mock).
/// A translator is never called for the source language; the stage handles
/// that case before reaching the seam.
pub trait Translator: Send + Sync {
    /// Translate one fragment of source-language text into `target`.
    fn translate(&self, text: &str, target: TargetLanguage) -> Result<String>;
}

impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn translate(&self, text: &str, target: TargetLanguage) -> Result<String> {
        (**self).translate(text, target)
    }
}

/// Translator that returns the input unchanged.
///
/// Stands in when no translation backend is configured; the translated
/// channel then mirrors the source channel.
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, text: &str, _target: TargetLanguage) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Mock translator for testing.
///
/// Produces `"[<code>] <text>"` so tests can assert which language was in
/// effect for each fragment. Failures can be scripted per call.
pub struct MockTranslator {
    failures: Mutex<VecDeque<String>>,
    calls: AtomicU32,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue one failure for the next translate call.
    pub fn with_failure(self, message: &str) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(message.to_string());
        }
        self
    }

    /// Number of translate calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for MockTranslator {
    fn translate(&self, text: &str, target: TargetLanguage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        if let Some(message) = failure {
            return Err(PolyscribeError::Translation { message });
        }
        Ok(format!("[{}] {}", target.code(), text))
    }
}
