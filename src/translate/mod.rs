//! Text translation.

pub mod cache;
pub mod translator;

pub use cache::{CachingTranslator, ModelLoader, TranslationModel};
pub use translator::{IdentityTranslator, MockTranslator, Translator};
