//! # locsync-translate
//!
//! Translation backend seam for the sync engine.
//!
//! The engine only sees [`Translator`] (one string, or a keyed batch) and
//! [`TranslatorFactory`] (one translator per target language). [`ChatFactory`]
//! is the production implementation: an OpenAI-compatible chat-completions
//! client.

mod chat;
mod context;
mod error;
pub mod prompt;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use locsync_core::BatchRequest;

pub use chat::{ChatBackend, ChatFactory};
pub use context::TranslatorContext;
pub use error::TranslateError;

/// A translation backend bound to one source/target language pair.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate a single string. `description` is context for the
    /// translator and may be empty.
    async fn translate(&self, text: &str, description: &str) -> Result<String, TranslateError>;

    /// Translate many strings in one call, keyed by request key. Callers
    /// treat any requested key missing from the result as
    /// [`TranslateError::MissingTranslation`].
    async fn translate_batch(
        &self,
        requests: &[BatchRequest],
    ) -> Result<HashMap<String, String>, TranslateError>;
}

/// Builds a [`Translator`] for one target language.
pub trait TranslatorFactory: Send + Sync {
    fn create(&self, context: TranslatorContext) -> Result<Arc<dyn Translator>, TranslateError>;
}
