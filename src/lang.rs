//! Target language codes for translation.
//!
//! A closed set: the recognizer always emits English, and translation models
//! exist only for the languages listed here. `En` therefore means "no
//! translation".

use crate::error::{PolyscribeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language the recognizer outputs, fixed by the speech model.
pub const SOURCE_LANGUAGE: TargetLanguage = TargetLanguage::En;

/// Supported target languages for the translated-text channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    En,
    Fr,
    Es,
    De,
    It,
    Pt,
}

impl TargetLanguage {
    /// All supported languages, in display order.
    pub const ALL: [TargetLanguage; 6] = [
        TargetLanguage::En,
        TargetLanguage::Fr,
        TargetLanguage::Es,
        TargetLanguage::De,
        TargetLanguage::It,
        TargetLanguage::Pt,
    ];

    /// Two-letter ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::En => "en",
            TargetLanguage::Fr => "fr",
            TargetLanguage::Es => "es",
            TargetLanguage::De => "de",
            TargetLanguage::It => "it",
            TargetLanguage::Pt => "pt",
        }
    }

    /// Human-readable name for status lines and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            TargetLanguage::En => "English",
            TargetLanguage::Fr => "French",
            TargetLanguage::Es => "Spanish",
            TargetLanguage::De => "German",
            TargetLanguage::It => "Italian",
            TargetLanguage::Pt => "Portuguese",
        }
    }

    /// Parse a language code (case-insensitive).
    pub fn from_code(code: &str) -> Result<Self> {
        let lower = code.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code() == lower)
            .ok_or(PolyscribeError::UnsupportedLanguage {
                code: code.to_string(),
            })
    }

    /// Whether a fragment with this target needs a translator call.
    ///
    /// The source language never does: the translated channel carries an
    /// empty fragment instead.
    pub fn requires_translation(&self) -> bool {
        *self != SOURCE_LANGUAGE
    }
}

impl Default for TargetLanguage {
    /// French, matching the application's historical default selection.
    fn default() -> Self {
        TargetLanguage::Fr
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TargetLanguage {
    type Err = PolyscribeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s)
    }
}
