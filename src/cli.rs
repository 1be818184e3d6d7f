//! Command-line interface for polyscribe
//!
//! Provides argument parsing using clap derive macros.

use crate::lang::TargetLanguage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Live speech transcription with streaming translation
#[derive(Parser, Debug)]
#[command(
    name = "polyscribe",
    version,
    about = "Live speech transcription with streaming translation"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Audio input device name (as printed by `polyscribe devices`)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Whisper model name or path (default: base.en)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Target language for translation (en disables translation)
    #[arg(long, value_name = "LANG")]
    pub target: Option<TargetLanguage>,

    /// Segment duration. Examples: 5s, 2500ms
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub segment: Option<Duration>,

    /// Delay between streamed characters in milliseconds (0 disables)
    #[arg(long, value_name = "MS")]
    pub char_delay: Option<u64>,
}

/// Parse a duration string.
///
/// Supports any format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`5s`, `500ms`), and compound (`1m30s`).
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,

    /// List supported target languages
    Languages,
}
