//! Language-constant module codec.
//!
//! ```text
//! export default {
//!   // greeting                  <- source: description
//!   "hello": "Hello",
//!   // hash: 1a2b3c4d            <- target: stored hash
//!   "bye": "Au revoir",
//! };
//! ```
//!
//! Keys and values are JSON string literals. Any line ending in `{` opens
//! the object (`export const fr = {`, `module.exports = {` also work); a
//! line starting with `}` closes it.

use locsync_core::{FormatTag, SourceRecord, TargetRecord};

use crate::error::{parse_err, FormatError};
use crate::{description_lines, hash_from_comments, strip_bom, RecordFormat, HASH_MARKER};

const HEADER: &str = "export default {";
const FOOTER: &str = "};";
const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsModuleFormat;

impl RecordFormat for JsModuleFormat {
    fn tag(&self) -> FormatTag {
        FormatTag::Js
    }

    fn parse_source(&self, content: &str) -> Result<Vec<SourceRecord>, FormatError> {
        Ok(parse_entries(content)?
            .into_iter()
            .map(|(key, value, comments)| SourceRecord::new(key, value, comments.join("\n")))
            .collect())
    }

    fn parse_target(&self, content: &str) -> Result<Vec<TargetRecord>, FormatError> {
        Ok(parse_entries(content)?
            .into_iter()
            .map(|(key, value, comments)| {
                let hash = hash_from_comments(&comments);
                TargetRecord::new(key, value, hash)
            })
            .collect())
    }

    fn render_source(&self, records: &[SourceRecord]) -> Result<String, FormatError> {
        let mut out = format!("{HEADER}\n");
        for record in records {
            for line in description_lines(&record.description) {
                push_comment(&mut out, line);
            }
            push_entry(&mut out, &record.key, &record.text)?;
        }
        out.push_str(FOOTER);
        out.push('\n');
        Ok(out)
    }

    fn render_target(&self, records: &[TargetRecord]) -> Result<String, FormatError> {
        let mut out = format!("{HEADER}\n");
        for record in records {
            push_comment(&mut out, &format!("{HASH_MARKER} {}", record.hash));
            push_entry(&mut out, &record.key, &record.text)?;
        }
        out.push_str(FOOTER);
        out.push('\n');
        Ok(out)
    }
}

type RawEntry = (String, String, Vec<String>);

fn parse_entries(content: &str) -> Result<Vec<RawEntry>, FormatError> {
    let mut entries = Vec::new();
    let mut comments = Vec::new();
    let mut in_object = false;
    let mut closed = false;

    for (index, raw) in strip_bom(content).lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if !in_object {
            if line.ends_with('{') {
                in_object = true;
            }
            continue;
        }
        if line.starts_with('}') {
            closed = true;
            break;
        }
        if line.is_empty() {
            comments.clear();
            continue;
        }
        if let Some(comment) = line.strip_prefix("//") {
            comments.push(comment.strip_prefix(' ').unwrap_or(comment).to_string());
            continue;
        }

        let (key, rest) = read_string_literal(line, line_no)?;
        let rest = rest
            .trim_start()
            .strip_prefix(':')
            .ok_or_else(|| parse_err(FormatTag::Js, line_no, "expected ':' after key"))?;
        let (value, rest) = read_string_literal(rest.trim_start(), line_no)?;
        let rest = rest.trim();
        if !(rest.is_empty() || rest == ",") {
            return Err(parse_err(
                FormatTag::Js,
                line_no,
                format!("unexpected trailing input '{rest}'"),
            ));
        }
        if key.is_empty() {
            return Err(parse_err(FormatTag::Js, line_no, "empty key"));
        }
        entries.push((key, value, std::mem::take(&mut comments)));
    }

    if !in_object {
        return Err(parse_err(FormatTag::Js, 1, "no object literal found"));
    }
    if !closed {
        return Err(parse_err(FormatTag::Js, content.lines().count(), "unterminated object literal"));
    }
    Ok(entries)
}

/// Read one leading JSON string literal, returning it and the remaining input.
fn read_string_literal(input: &str, line_no: usize) -> Result<(String, &str), FormatError> {
    if !input.starts_with('"') {
        return Err(parse_err(FormatTag::Js, line_no, "expected a double-quoted string"));
    }
    let mut escaped = false;
    let mut end = None;
    for (i, c) in input.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            end = Some(i);
            break;
        }
    }
    let end = end.ok_or_else(|| parse_err(FormatTag::Js, line_no, "unterminated string"))?;
    let value: String = serde_json::from_str(&input[..=end])
        .map_err(|e| parse_err(FormatTag::Js, line_no, e.to_string()))?;
    Ok((value, &input[end + 1..]))
}

fn push_comment(out: &mut String, text: &str) {
    out.push_str(INDENT);
    out.push_str("// ");
    out.push_str(text);
    out.push('\n');
}

fn push_entry(out: &mut String, key: &str, value: &str) -> Result<(), FormatError> {
    let to_literal = |s: &str| {
        serde_json::to_string(s).map_err(|e| FormatError::Render {
            format: FormatTag::Js,
            message: e.to_string(),
        })
    };
    out.push_str(INDENT);
    out.push_str(&to_literal(key)?);
    out.push_str(": ");
    out.push_str(&to_literal(value)?);
    out.push_str(",\n");
    Ok(())
}
