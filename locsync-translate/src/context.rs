use std::path::Path;

use crate::TranslateError;

/// Everything a backend needs to know about one target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorContext {
    pub source_language: String,
    pub target_language: String,
    /// Global and per-language instructions, concatenated in that order.
    pub instructions: Option<String>,
}

impl TranslatorContext {
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            instructions: None,
        }
    }

    /// Build a context, reading the optional global and per-language
    /// instructions files. Fails if a named file cannot be read.
    pub fn load(
        source_language: &str,
        target_language: &str,
        global_instructions: Option<&Path>,
        target_instructions: Option<&Path>,
    ) -> Result<Self, TranslateError> {
        let mut blocks = Vec::new();
        for path in [global_instructions, target_instructions].into_iter().flatten() {
            let text = std::fs::read_to_string(path).map_err(|source| {
                TranslateError::Instructions {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            let text = text.trim();
            if !text.is_empty() {
                blocks.push(text.to_string());
            }
        }
        Ok(Self {
            instructions: (!blocks.is_empty()).then(|| blocks.join("\n\n")),
            ..Self::new(source_language, target_language)
        })
    }
}
