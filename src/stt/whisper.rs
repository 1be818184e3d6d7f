//! Whisper-based speech recognition.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::error::{PolyscribeError, Result};
use crate::lang::SOURCE_LANGUAGE;
use crate::pipeline::types::{AudioSegment, TextFragment};
use crate::stt::recognizer::Recognizer;
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use whisper_rs::{
    install_logging_hooks, FullParams, SamplingStrategy, WhisperContext,
    WhisperContextParameters,
};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper recognizer.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.en.bin"),
            threads: None,
        }
    }
}

/// Whisper implementation of the [`Recognizer`] trait.
///
/// The WhisperContext is wrapped in a Mutex to ensure thread safety; the
/// recognition stage is the only caller in practice.
pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

impl WhisperRecognizer {
    /// Load a Whisper model.
    ///
    /// # Errors
    /// Returns `PolyscribeError::RecognitionModelNotFound` if the model file
    /// doesn't exist, `PolyscribeError::Recognition` if loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(PolyscribeError::RecognitionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut context_params = WhisperContextParameters::default();
        // Fused attention kernels; avoids the standalone softmax CUDA kernel
        // that crashes on Blackwell GPUs with older ggml.
        context_params.flash_attn(true);
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| PolyscribeError::Recognition {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| PolyscribeError::Recognition {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

impl Recognizer for WhisperRecognizer {
    fn recognize(&self, segment: &AudioSegment) -> Result<Vec<TextFragment>> {
        let context = self
            .context
            .lock()
            .map_err(|e| PolyscribeError::Recognition {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        let mut state = context
            .create_state()
            .map_err(|e| PolyscribeError::Recognition {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(SOURCE_LANGUAGE.code()));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        // Disable printing to stdout/stderr
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &segment.samples)
            .map_err(|e| PolyscribeError::Recognition {
                message: format!("Whisper inference failed: {}", e),
            })?;

        // One fragment per Whisper segment, so long audio streams out in
        // sentence-sized lines rather than one block.
        let mut fragments = Vec::new();
        for whisper_segment in state.as_iter() {
            let text = whisper_segment.to_string();
            let text = text.trim();
            if !text.is_empty() {
                fragments.push(TextFragment::new(text));
            }
        }

        Ok(fragments)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        // Ready if construction succeeded.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.en.bin"));
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_new_fails_for_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            threads: None,
        };

        let result = WhisperRecognizer::new(config);
        match result {
            Err(PolyscribeError::RecognitionModelNotFound { path }) => {
                assert_eq!(path, "/nonexistent/model.bin");
            }
            _ => panic!("Expected RecognitionModelNotFound error"),
        }
    }

    #[test]
    fn test_recognizer_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<WhisperRecognizer>();
        assert_sync::<WhisperRecognizer>();
    }

    #[test]
    fn test_implements_recognizer_trait() {
        fn _assert_recognizer_trait_bounds<T: Recognizer>() {}
        _assert_recognizer_trait_bounds::<WhisperRecognizer>();
    }
}
