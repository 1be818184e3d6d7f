use crate::error::Result;
use crate::lang::TargetLanguage;
use crate::pipeline::types::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
#[cfg(feature = "cli")]
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub translation: TranslationConfig,
    pub display: DisplayConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub segment_duration_secs: f32,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model: String,
}

/// Translation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    pub target: TargetLanguage,
}

/// Output rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub char_delay_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: crate::defaults::SAMPLE_RATE,
            segment_duration_secs: crate::defaults::SEGMENT_DURATION.as_secs_f32(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: crate::defaults::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target: TargetLanguage::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            char_delay_ms: crate::defaults::CHAR_DELAY.as_millis() as u64,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Panics on invalid TOML rather than silently running misconfigured.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(crate::error::PolyscribeError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Self::default()
            }
            Err(e) => {
                panic!("Failed to load config from {}: {}", path.display(), e);
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - POLYSCRIBE_MODEL → stt.model
    /// - POLYSCRIBE_TARGET_LANGUAGE → translation.target
    /// - POLYSCRIBE_AUDIO_DEVICE → audio.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("POLYSCRIBE_MODEL")
            && !model.is_empty()
        {
            self.stt.model = model;
        }

        if let Ok(language) = std::env::var("POLYSCRIBE_TARGET_LANGUAGE")
            && let Ok(target) = TargetLanguage::from_code(&language)
        {
            self.translation.target = target;
        }

        if let Ok(device) = std::env::var("POLYSCRIBE_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/polyscribe/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("polyscribe")
            .join("config.toml")
    }

    /// Build the runtime pipeline configuration from this file config.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            segment_duration: Duration::from_secs_f32(self.audio.segment_duration_secs),
            target_language: self.translation.target,
            device: self
                .audio
                .device
                .as_deref()
                .map(crate::audio::source::DeviceInfo::new),
            char_delay: Duration::from_millis(self.display.char_delay_ms),
            ..PipelineConfig::default()
        }
    }
}
