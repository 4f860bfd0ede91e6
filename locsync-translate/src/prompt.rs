//! Prompt construction and reply parsing for chat-style backends.

use std::collections::HashMap;

use locsync_core::BatchRequest;
use serde_json::Value;

use crate::{TranslateError, TranslatorContext};

/// System prompt shared by single and batch calls.
pub fn system_prompt(context: &TranslatorContext) -> String {
    let mut prompt = format!(
        "You are a professional software localizer. Translate user interface strings \
         from {} to {}. Preserve placeholders, markup, escape sequences and leading or \
         trailing whitespace exactly. Use any description only as context; never translate it.",
        context.source_language, context.target_language
    );
    if let Some(instructions) = &context.instructions {
        prompt.push_str("\n\nAdditional instructions:\n");
        prompt.push_str(instructions);
    }
    prompt
}

pub fn single_message(text: &str, description: &str) -> String {
    let mut message = String::new();
    if !description.is_empty() {
        message.push_str("Context: ");
        message.push_str(description);
        message.push_str("\n\n");
    }
    message.push_str(
        "Reply with the translation only, without quotes or commentary.\n\nText:\n",
    );
    message.push_str(text);
    message
}

pub fn batch_message(requests: &[BatchRequest]) -> Result<String, TranslateError> {
    let items = serde_json::to_string_pretty(requests)
        .map_err(|e| TranslateError::Backend(format!("cannot encode batch: {e}")))?;
    Ok(format!(
        "Translate the `text` of every item below. Reply with a single JSON object \
         mapping each `key` to its translated text and nothing else.\n\n{items}"
    ))
}

/// Parse a single-string reply. An empty reply is rejected.
pub fn parse_single_reply(content: &str) -> Result<String, TranslateError> {
    let text = strip_code_fence(content);
    if text.trim().is_empty() {
        return Err(TranslateError::InvalidResponse("empty translation".into()));
    }
    Ok(text.to_string())
}

/// Parse a batch reply: a JSON object of key to translated string.
///
/// Keys the caller did not ask for are kept; the caller decides what to do
/// with them. Missing keys are not detected here.
pub fn parse_batch_reply(content: &str) -> Result<HashMap<String, String>, TranslateError> {
    let body = strip_code_fence(content);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TranslateError::InvalidResponse(format!("batch reply is not JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(TranslateError::InvalidResponse(
            "batch reply is not a JSON object".into(),
        ));
    };
    map.into_iter()
        .map(|(key, value)| match value {
            Value::String(text) => Ok((key, text)),
            other => Err(TranslateError::InvalidResponse(format!(
                "value for key '{key}' is not a string: {other}"
            ))),
        })
        .collect()
}

/// Remove one surrounding Markdown code fence, if present.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return content.trim_end_matches(['\r', '\n']);
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return content.trim_end_matches(['\r', '\n']);
    };
    // Drop the info string (`json`, `text`, ...) on the opening line.
    match inner.split_once('\n') {
        Some((_, body)) => body.trim_end_matches(['\r', '\n']),
        None => inner,
    }
}
