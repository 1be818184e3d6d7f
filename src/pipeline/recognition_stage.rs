//! Recognition stage: turns audio segments into text fragments, streams the
//! source text, and feeds the fragment queue.

use crate::pipeline::emit::stream_fragment;
use crate::pipeline::types::{snapshot, AudioSegment, SharedConfig, StatusLog, TextFragment};
use crate::stt::recognizer::Recognizer;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct RecognitionStage {
    recognizer: Arc<dyn Recognizer>,
    audio_rx: Receiver<AudioSegment>,
    source_tx: Sender<char>,
    fragment_tx: Sender<TextFragment>,
    config: SharedConfig,
    stop: Arc<AtomicBool>,
    log: StatusLog,
}

impl RecognitionStage {
    pub(crate) fn new(
        recognizer: Arc<dyn Recognizer>,
        audio_rx: Receiver<AudioSegment>,
        source_tx: Sender<char>,
        fragment_tx: Sender<TextFragment>,
        config: SharedConfig,
        stop: Arc<AtomicBool>,
        log: StatusLog,
    ) -> Self {
        Self {
            recognizer,
            audio_rx,
            source_tx,
            fragment_tx,
            config,
            stop,
            log,
        }
    }

    /// Recognition loop. A failed segment is logged and dropped; the next
    /// segment is processed normally.
    pub(crate) fn run(self) {
        loop {
            let config = snapshot(&self.config);

            let segment = match self.audio_rx.recv_timeout(config.recv_timeout) {
                Ok(segment) => segment,
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop.load(Ordering::Relaxed) {
                        return;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => return,
            };

            let fragments = match self.recognizer.recognize(&segment) {
                Ok(fragments) => fragments,
                Err(err) => {
                    self.log
                        .emit(format!("recognition error on segment {}: {err}", segment.sequence));
                    continue;
                }
            };

            for fragment in fragments {
                let text = fragment.text.trim();
                if text.is_empty() {
                    continue;
                }
                let fragment = TextFragment::new(text);

                if !stream_fragment(&self.source_tx, &fragment.text, config.char_delay) {
                    return;
                }
                if !self.enqueue(fragment, config.recv_timeout) {
                    return;
                }
            }
        }
    }

    /// Push a fragment onto the bounded queue, polling the stop flag while
    /// it is full. Returns `false` when the stage should exit.
    fn enqueue(&self, fragment: TextFragment, timeout: std::time::Duration) -> bool {
        let mut fragment = fragment;
        loop {
            match self.fragment_tx.send_timeout(fragment, timeout) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(back)) => {
                    if self.stop.load(Ordering::Relaxed) {
                        return false;
                    }
                    fragment = back;
                }
                Err(SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }
}
