//! End-to-end pipeline tests using the mock audio source, recognizer, and
//! translator.

use polyscribe::audio::source::MockAudioSource;
use polyscribe::lang::TargetLanguage;
use polyscribe::pipeline::{LifecycleState, PipelineConfig, PipelineController};
use polyscribe::stt::recognizer::MockRecognizer;
use polyscribe::translate::translator::MockTranslator;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Duration;

fn fast_config(target: TargetLanguage) -> PipelineConfig {
    PipelineConfig {
        char_delay: Duration::ZERO,
        recv_timeout: Duration::from_millis(5),
        capture_retry: Duration::from_millis(1),
        target_language: target,
        ..PipelineConfig::default()
    }
}

/// Read characters until the next newline; panics if none arrives in time.
fn read_line(rx: &Receiver<char>) -> String {
    let mut line = String::new();
    loop {
        let ch = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("timed out waiting for output");
        if ch == '\n' {
            return line;
        }
        line.push(ch);
    }
}

fn samples(n: usize) -> Vec<f32> {
    vec![0.01; n]
}

#[test]
fn single_segment_flows_through_both_channels() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::Es));
    let source_rx = controller.source_chars();
    let translated_rx = controller.translated_chars();

    let translator = Arc::new(MockTranslator::new());
    controller
        .start(
            Box::new(MockAudioSource::new().with_segments(vec![samples(160)])),
            Arc::new(MockRecognizer::new().with_fragments(&["Hello world"])),
            translator.clone(),
        )
        .unwrap();

    assert_eq!(read_line(&source_rx), "Hello world");
    assert_eq!(read_line(&translated_rx), "[es] Hello world");
    assert_eq!(translator.calls(), 1);

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn source_target_skips_translator_and_emits_empty_line() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::En));
    let source_rx = controller.source_chars();
    let translated_rx = controller.translated_chars();

    let translator = Arc::new(MockTranslator::new());
    controller
        .start(
            Box::new(MockAudioSource::new().with_segments(vec![samples(160)])),
            Arc::new(MockRecognizer::new().with_fragments(&["Hello"])),
            translator.clone(),
        )
        .unwrap();

    assert_eq!(read_line(&source_rx), "Hello");
    // The translated channel still marks the fragment boundary.
    assert_eq!(read_line(&translated_rx), "");
    assert_eq!(translator.calls(), 0);

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn translation_failure_falls_back_to_source_text() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::Fr));
    let translated_rx = controller.translated_chars();
    let status_rx = controller.status_messages();

    controller
        .start(
            Box::new(MockAudioSource::new().with_segments(vec![samples(160), samples(160)])),
            Arc::new(
                MockRecognizer::new()
                    .with_fragments(&["falls back"])
                    .with_fragments(&["translated fine"]),
            ),
            Arc::new(MockTranslator::new().with_failure("backend down")),
        )
        .unwrap();

    // First fragment: translator fails, original text is streamed instead.
    assert_eq!(read_line(&translated_rx), "falls back");
    // Second fragment: translator works again.
    assert_eq!(read_line(&translated_rx), "[fr] translated fine");

    let status = status_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(status.contains("backend down"));

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn recognition_failure_only_loses_its_own_segment() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::Fr));
    let source_rx = controller.source_chars();
    let status_rx = controller.status_messages();

    controller
        .start(
            Box::new(
                MockAudioSource::new()
                    .with_segments(vec![samples(160), samples(160), samples(160)]),
            ),
            Arc::new(
                MockRecognizer::new()
                    .with_fragments(&["first"])
                    .with_failure("inference failed")
                    .with_fragments(&["third"]),
            ),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();

    assert_eq!(read_line(&source_rx), "first");
    assert_eq!(read_line(&source_rx), "third");

    let status = status_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(status.contains("inference failed"));

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn fragments_stream_in_order_without_interleaving() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::De));
    let source_rx = controller.source_chars();
    let translated_rx = controller.translated_chars();

    controller
        .start(
            Box::new(MockAudioSource::new().with_segments(vec![samples(160)])),
            Arc::new(MockRecognizer::new().with_fragments(&["one", "two", "three"])),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();

    assert_eq!(read_line(&source_rx), "one");
    assert_eq!(read_line(&source_rx), "two");
    assert_eq!(read_line(&source_rx), "three");

    assert_eq!(read_line(&translated_rx), "[de] one");
    assert_eq!(read_line(&translated_rx), "[de] two");
    assert_eq!(read_line(&translated_rx), "[de] three");

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn language_change_applies_to_next_fragment() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::Fr));
    let translated_rx = controller.translated_chars();

    let source = MockAudioSource::new();
    let feeder = source.feeder();
    controller
        .start(
            Box::new(source),
            Arc::new(
                MockRecognizer::new()
                    .with_fragments(&["before"])
                    .with_fragments(&["after"]),
            ),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();

    // Feed segments one at a time so the language change lands between them.
    feeder.feed(samples(160));
    assert_eq!(read_line(&translated_rx), "[fr] before");

    controller.set_target_language(TargetLanguage::Pt);
    feeder.feed(samples(160));
    assert_eq!(read_line(&translated_rx), "[pt] after");

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn restart_after_confirmed_stop_produces_fresh_output() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::It));
    let source_rx = controller.source_chars();

    controller
        .start(
            Box::new(MockAudioSource::new().with_segments(vec![samples(160)])),
            Arc::new(MockRecognizer::new().with_fragments(&["run one"])),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();
    assert_eq!(read_line(&source_rx), "run one");

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
    assert_eq!(controller.state(), LifecycleState::Idle);

    controller
        .start(
            Box::new(MockAudioSource::new().with_segments(vec![samples(160)])),
            Arc::new(MockRecognizer::new().with_fragments(&["run two"])),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();
    assert_eq!(read_line(&source_rx), "run two");

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn immediate_restart_waits_for_previous_generation() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::Fr));
    let source_rx = controller.source_chars();

    controller
        .start(
            Box::new(MockAudioSource::new()),
            Arc::new(MockRecognizer::new()),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();

    // Stop without waiting; the next start must drain the old workers
    // before spawning new ones.
    controller.stop();
    controller
        .start(
            Box::new(MockAudioSource::new().with_segments(vec![samples(160)])),
            Arc::new(MockRecognizer::new().with_fragments(&["second generation"])),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();
    assert_eq!(controller.state(), LifecycleState::Running);
    assert_eq!(read_line(&source_rx), "second generation");

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}

#[test]
fn stop_is_idempotent_across_states() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::Fr));

    // Idle: no-op.
    controller.stop();
    assert_eq!(controller.state(), LifecycleState::Idle);

    controller
        .start(
            Box::new(MockAudioSource::new()),
            Arc::new(MockRecognizer::new()),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();

    controller.stop();
    controller.stop();
    assert_eq!(controller.state(), LifecycleState::Stopping);

    controller.await_idle(Duration::from_secs(5)).unwrap();
    controller.stop();
    assert_eq!(controller.state(), LifecycleState::Idle);
}

#[test]
fn device_error_is_reported_and_capture_continues() {
    let mut controller = PipelineController::with_config(fast_config(TargetLanguage::Fr));
    let source_rx = controller.source_chars();
    let status_rx = controller.status_messages();

    controller
        .start(
            Box::new(
                MockAudioSource::new()
                    .with_capture_failure("device unplugged")
                    .with_segments(vec![samples(160)]),
            ),
            Arc::new(MockRecognizer::new().with_fragments(&["recovered"])),
            Arc::new(MockTranslator::new()),
        )
        .unwrap();

    let status = status_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(status.contains("device unplugged"));
    assert_eq!(read_line(&source_rx), "recovered");

    controller.stop_and_wait(Duration::from_secs(5)).unwrap();
}
