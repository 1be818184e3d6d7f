//! The streaming transcription/translation pipeline.
//!
//! Three workers connected by bounded queues:
//!
//! ```text
//! AudioSource -> CaptureStage -> [audio queue] -> RecognitionStage
//!     RecognitionStage -> source-text chars
//!     RecognitionStage -> [fragment queue] -> TranslationStage -> translated chars
//! ```
//!
//! [`PipelineController`] owns the lifecycle and the output channels.

mod capture_stage;
mod controller;
mod emit;
mod recognition_stage;
mod translation_stage;
pub mod types;

pub use controller::PipelineController;
pub use types::{
    snapshot, AudioSegment, LifecycleState, PipelineConfig, SharedConfig, StatusLog,
    TextFragment,
};
