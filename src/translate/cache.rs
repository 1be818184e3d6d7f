//! Lazy per-language translation model cache.
//!
//! Models are expensive to load, so each language's model is built on first
//! use and reused for the rest of the process. Loading happens under a
//! per-language lock: two fragments targeting the same language never load
//! the model twice, while fragments targeting different languages do not
//! block each other.

use crate::error::{PolyscribeError, Result};
use crate::lang::TargetLanguage;
use crate::translate::translator::Translator;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A loaded translation model for one fixed target language.
pub trait TranslationModel: Send + Sync {
    /// Translate source-language text into this model's language.
    fn translate(&self, text: &str) -> Result<String>;
}

/// Factory for translation models, invoked once per language on first use.
pub trait ModelLoader: Send + Sync {
    fn load(&self, target: TargetLanguage) -> Result<Arc<dyn TranslationModel>>;
}

type ModelSlot = Arc<Mutex<Option<Arc<dyn TranslationModel>>>>;

/// Translator that loads models lazily and caches them per language.
///
/// A failed load is not cached: the next fragment for that language retries
/// from scratch.
pub struct CachingTranslator<L: ModelLoader> {
    loader: L,
    slots: Mutex<HashMap<TargetLanguage, ModelSlot>>,
}

impl<L: ModelLoader> CachingTranslator<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the cached model for `target`, loading it on first use.
    fn model(&self, target: TargetLanguage) -> Result<Arc<dyn TranslationModel>> {
        // Two locks: the outer map lock is held only long enough to find or
        // insert the slot, so loading one language never blocks another.
        let slot = {
            let mut slots = self.slots.lock().map_err(|_| PolyscribeError::Pipeline {
                message: "translation cache lock poisoned".to_string(),
            })?;
            slots.entry(target).or_default().clone()
        };

        let mut guard = slot.lock().map_err(|_| PolyscribeError::Pipeline {
            message: "translation model lock poisoned".to_string(),
        })?;
        if let Some(model) = guard.as_ref() {
            return Ok(model.clone());
        }
        let model = self.loader.load(target)?;
        *guard = Some(model.clone());
        Ok(model)
    }
}

impl<L: ModelLoader> Translator for CachingTranslator<L> {
    fn translate(&self, text: &str, target: TargetLanguage) -> Result<String> {
        self.model(target)?.translate(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    struct FakeModel {
        target: TargetLanguage,
    }

    impl TranslationModel for FakeModel {
        fn translate(&self, text: &str) -> Result<String> {
            Ok(format!("{}:{}", self.target.code(), text))
        }
    }

    struct CountingLoader {
        loads: AtomicU32,
        fail_first: AtomicU32,
    }

    impl CountingLoader {
        fn new() -> Self {
            Self {
                loads: AtomicU32::new(0),
                fail_first: AtomicU32::new(0),
            }
        }

        fn failing_first(count: u32) -> Self {
            Self {
                loads: AtomicU32::new(0),
                fail_first: AtomicU32::new(count),
            }
        }

        fn loads(&self) -> u32 {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, target: TargetLanguage) -> Result<Arc<dyn TranslationModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(PolyscribeError::TranslationModelLoad {
                    language: target.code().to_string(),
                    message: "weights missing".to_string(),
                });
            }
            Ok(Arc::new(FakeModel { target }))
        }
    }

    #[test]
    fn test_loads_once_per_language() {
        let translator = CachingTranslator::new(CountingLoader::new());

        assert_eq!(
            translator.translate("a", TargetLanguage::Fr).unwrap(),
            "fr:a"
        );
        assert_eq!(
            translator.translate("b", TargetLanguage::Fr).unwrap(),
            "fr:b"
        );
        assert_eq!(
            translator.translate("c", TargetLanguage::Es).unwrap(),
            "es:c"
        );
        assert_eq!(translator.loader.loads(), 2);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let translator = CachingTranslator::new(CountingLoader::failing_first(1));

        let first = translator.translate("a", TargetLanguage::De);
        assert!(matches!(
            first,
            Err(PolyscribeError::TranslationModelLoad { language, .. }) if language == "de"
        ));

        let second = translator.translate("a", TargetLanguage::De).unwrap();
        assert_eq!(second, "de:a");
        assert_eq!(translator.loader.loads(), 2);
    }

    #[test]
    fn test_concurrent_same_language_loads_once() {
        let translator = Arc::new(CachingTranslator::new(CountingLoader::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let translator = translator.clone();
                thread::spawn(move || {
                    translator
                        .translate(&format!("t{i}"), TargetLanguage::It)
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().starts_with("it:"));
        }
        assert_eq!(translator.loader.loads(), 1);
    }
}
