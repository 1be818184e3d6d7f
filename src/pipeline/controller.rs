//! Pipeline lifecycle: spawning, stopping, and confirmed teardown of the
//! stage workers.

use crate::audio::source::{AudioSource, DeviceInfo};
use crate::defaults;
use crate::error::{PolyscribeError, Result};
use crate::lang::TargetLanguage;
use crate::pipeline::capture_stage::CaptureStage;
use crate::pipeline::recognition_stage::RecognitionStage;
use crate::pipeline::translation_stage::TranslationStage;
use crate::pipeline::types::{
    snapshot, LifecycleState, PipelineConfig, SharedConfig, StatusLog,
};
use crate::stt::recognizer::Recognizer;
use crate::translate::translator::Translator;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

/// Interval at which teardown re-checks whether a worker has exited.
const JOIN_POLL: Duration = Duration::from_millis(10);

struct Worker {
    name: &'static str,
    handle: thread::JoinHandle<()>,
}

/// Owner of the pipeline: spawns the stage workers, carries the shared
/// configuration, and hands out the output channels.
///
/// The lifecycle is `Idle -> Running -> Stopping -> Idle`. `Stopping` ends
/// only when every worker has been joined, so a new run can never overlap a
/// draining one.
pub struct PipelineController {
    config: SharedConfig,
    state: LifecycleState,
    stop: Arc<AtomicBool>,
    workers: Vec<Worker>,
    source_tx: Sender<char>,
    source_rx: Receiver<char>,
    translated_tx: Sender<char>,
    translated_rx: Receiver<char>,
    log_tx: Sender<String>,
    log_rx: Receiver<String>,
}

impl PipelineController {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        // Output channels are unbounded: characters must never be dropped,
        // and they outlive individual runs so consumers keep their receiver
        // across restarts.
        let (source_tx, source_rx) = unbounded();
        let (translated_tx, translated_rx) = unbounded();
        let (log_tx, log_rx) = unbounded();
        Self {
            config: Arc::new(RwLock::new(config)),
            state: LifecycleState::Idle,
            stop: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            source_tx,
            source_rx,
            translated_tx,
            translated_rx,
            log_tx,
            log_rx,
        }
    }

    /// Spawn the three stage workers.
    ///
    /// Fails if the pipeline is already running. If a previous run is still
    /// stopping, waits up to the stop grace period for it to drain first; a
    /// run that refuses to die makes this return an error rather than spawn
    /// a second generation of workers.
    pub fn start(
        &mut self,
        source: Box<dyn AudioSource>,
        recognizer: Arc<dyn Recognizer>,
        translator: Arc<dyn Translator>,
    ) -> Result<()> {
        match self.state {
            LifecycleState::Running => {
                return Err(PolyscribeError::Pipeline {
                    message: "pipeline is already running".to_string(),
                });
            }
            LifecycleState::Stopping => self.await_idle(defaults::STOP_GRACE)?,
            LifecycleState::Idle => {}
        }

        self.stop.store(false, Ordering::Relaxed);
        let config = snapshot(&self.config);
        let (audio_tx, audio_rx) = bounded(config.audio_buffer);
        let (fragment_tx, fragment_rx) = bounded(config.fragment_buffer);
        let log = StatusLog::new(self.log_tx.clone());

        let capture = CaptureStage::new(
            source,
            audio_tx,
            self.config.clone(),
            self.stop.clone(),
            log.clone(),
        );
        let recognition = RecognitionStage::new(
            recognizer,
            audio_rx,
            self.source_tx.clone(),
            fragment_tx,
            self.config.clone(),
            self.stop.clone(),
            log.clone(),
        );
        let translation = TranslationStage::new(
            translator,
            fragment_rx,
            self.translated_tx.clone(),
            self.config.clone(),
            self.stop.clone(),
            log,
        );

        self.spawn_worker("capture", move || capture.run())?;
        self.spawn_worker("recognition", move || recognition.run())?;
        self.spawn_worker("translation", move || translation.run())?;
        self.state = LifecycleState::Running;
        Ok(())
    }

    fn spawn_worker<F>(&mut self, name: &'static str, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("polyscribe-{name}"))
            .spawn(body)?;
        self.workers.push(Worker { name, handle });
        Ok(())
    }

    /// Request shutdown without blocking.
    ///
    /// Workers observe the flag at their next poll; in-flight segments and
    /// fragments finish streaming. No-op unless the pipeline is running.
    pub fn stop(&mut self) {
        if self.state == LifecycleState::Running {
            self.stop.store(true, Ordering::Relaxed);
            self.state = LifecycleState::Stopping;
        }
    }

    /// Wait for every worker of the stopping run to exit, then return to
    /// `Idle`.
    ///
    /// A worker that does not finish within `timeout` leaves the pipeline in
    /// `Stopping` and returns an error; the call can be retried. A worker
    /// that panicked is reported on the status channel but does not fail
    /// teardown.
    pub fn await_idle(&mut self, timeout: Duration) -> Result<()> {
        match self.state {
            LifecycleState::Idle => return Ok(()),
            LifecycleState::Running => {
                return Err(PolyscribeError::Pipeline {
                    message: "pipeline is running; call stop() first".to_string(),
                });
            }
            LifecycleState::Stopping => {}
        }

        let deadline = Instant::now() + timeout;
        while let Some(worker) = self.workers.pop() {
            while !worker.handle.is_finished() {
                if Instant::now() >= deadline {
                    let name = worker.name;
                    self.workers.push(worker);
                    return Err(PolyscribeError::Pipeline {
                        message: format!("worker '{name}' did not stop within {timeout:?}"),
                    });
                }
                thread::sleep(JOIN_POLL);
            }
            if worker.handle.join().is_err() {
                self.log_tx
                    .try_send(format!("worker '{}' panicked", worker.name))
                    .ok();
            }
        }
        self.state = LifecycleState::Idle;
        Ok(())
    }

    /// `stop()` followed by `await_idle(timeout)`.
    pub fn stop_and_wait(&mut self, timeout: Duration) -> Result<()> {
        self.stop();
        self.await_idle(timeout)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Characters of recognized source-language text, newline-terminated per
    /// fragment.
    pub fn source_chars(&self) -> Receiver<char> {
        self.source_rx.clone()
    }

    /// Characters of translated text, newline-terminated per fragment.
    pub fn translated_chars(&self) -> Receiver<char> {
        self.translated_rx.clone()
    }

    /// Status and error lines from the stage workers.
    pub fn status_messages(&self) -> Receiver<String> {
        self.log_rx.clone()
    }

    /// Change the translation target. Applies to the next fragment dequeued.
    pub fn set_target_language(&self, language: TargetLanguage) {
        self.update(|config| config.target_language = language);
    }

    /// Change the capture device. Applies at the next segment boundary;
    /// `None` selects the source's default device.
    pub fn set_input_device(&self, device: Option<DeviceInfo>) {
        self.update(|config| config.device = device);
    }

    /// Change the segment duration. Applies to the next capture.
    pub fn set_segment_duration(&self, duration: Duration) {
        self.update(|config| config.segment_duration = duration);
    }

    /// Change the delay between streamed characters.
    pub fn set_char_delay(&self, delay: Duration) {
        self.update(|config| config.char_delay = delay);
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> PipelineConfig {
        snapshot(&self.config)
    }

    fn update(&self, mutate: impl FnOnce(&mut PipelineConfig)) {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        mutate(&mut guard);
    }
}

impl Default for PipelineController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.stop();
        // Best effort; a stuck worker is detached rather than blocked on.
        self.await_idle(Duration::from_secs(1)).ok();
    }
}
