//! Translation stage: translates recognized fragments and streams the
//! translated text.

use crate::lang::TargetLanguage;
use crate::pipeline::emit::stream_fragment;
use crate::pipeline::types::{snapshot, SharedConfig, StatusLog, TextFragment};
use crate::translate::translator::Translator;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct TranslationStage {
    translator: Arc<dyn Translator>,
    fragment_rx: Receiver<TextFragment>,
    translated_tx: Sender<char>,
    config: SharedConfig,
    stop: Arc<AtomicBool>,
    log: StatusLog,
}

impl TranslationStage {
    pub(crate) fn new(
        translator: Arc<dyn Translator>,
        fragment_rx: Receiver<TextFragment>,
        translated_tx: Sender<char>,
        config: SharedConfig,
        stop: Arc<AtomicBool>,
        log: StatusLog,
    ) -> Self {
        Self {
            translator,
            fragment_rx,
            translated_tx,
            config,
            stop,
            log,
        }
    }

    /// Translation loop. The target language is sampled when a fragment is
    /// dequeued, so a language change applies to the next fragment and never
    /// rewrites text already streamed.
    pub(crate) fn run(self) {
        loop {
            let config = snapshot(&self.config);

            let fragment = match self.fragment_rx.recv_timeout(config.recv_timeout) {
                Ok(fragment) => fragment,
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop.load(Ordering::Relaxed) {
                        return;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            };

            let text = self.translate(&fragment.text, config.target_language);
            if !stream_fragment(&self.translated_tx, &text, config.char_delay) {
                return;
            }
        }
    }

    /// Translate one fragment, falling back to the original text when the
    /// translator fails. The source language short-circuits to an empty
    /// line; the translator is never called for it.
    fn translate(&self, text: &str, target: TargetLanguage) -> String {
        if !target.requires_translation() {
            return String::new();
        }
        match self.translator.translate(text, target) {
            Ok(translated) => translated,
            Err(err) => {
                self.log.emit(format!("translation error: {err}"));
                text.to_string()
            }
        }
    }
}
