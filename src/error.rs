//! Error types for polyscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolyscribeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unsupported target language: {code}")]
    UnsupportedLanguage { code: String },

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    Capture { message: String },

    // Recognition errors
    #[error("Recognition model not found at {path}")]
    RecognitionModelNotFound { path: String },

    #[error("Recognition failed: {message}")]
    Recognition { message: String },

    // Translation errors
    #[error("Failed to load translation model for {language}: {message}")]
    TranslationModelLoad { language: String, message: String },

    #[error("Translation failed: {message}")]
    Translation { message: String },

    // Pipeline lifecycle errors
    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, PolyscribeError>;
