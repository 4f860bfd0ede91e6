//! Key/value-with-comments codec (Java `.properties` style).
//!
//! ```text
//! # Shown on the home page        <- source: description
//! hello=Hello
//!
//! # hash: 1a2b3c4d                 <- target: stored hash
//! hello=Bonjour
//! ```
//!
//! Comment lines (`#` or `!`) directly above an entry belong to it; a blank
//! line drops them. Logical lines may continue with a trailing backslash.

use locsync_core::{FormatTag, SourceRecord, TargetRecord};

use crate::error::{parse_err, FormatError};
use crate::{description_lines, hash_from_comments, strip_bom, RecordFormat, HASH_MARKER};

#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesFormat;

impl RecordFormat for PropertiesFormat {
    fn tag(&self) -> FormatTag {
        FormatTag::Properties
    }

    fn parse_source(&self, content: &str) -> Result<Vec<SourceRecord>, FormatError> {
        Ok(parse_entries(content)?
            .into_iter()
            .map(|e| SourceRecord::new(e.key, e.value, e.comments.join("\n")))
            .collect())
    }

    fn parse_target(&self, content: &str) -> Result<Vec<TargetRecord>, FormatError> {
        Ok(parse_entries(content)?
            .into_iter()
            .map(|e| {
                let hash = hash_from_comments(&e.comments);
                TargetRecord::new(e.key, e.value, hash)
            })
            .collect())
    }

    fn render_source(&self, records: &[SourceRecord]) -> Result<String, FormatError> {
        let mut out = String::new();
        for record in records {
            for line in description_lines(&record.description) {
                push_comment(&mut out, line);
            }
            push_entry(&mut out, &record.key, &record.text);
        }
        Ok(out)
    }

    fn render_target(&self, records: &[TargetRecord]) -> Result<String, FormatError> {
        let mut out = String::new();
        for record in records {
            push_comment(&mut out, &format!("{HASH_MARKER} {}", record.hash));
            push_entry(&mut out, &record.key, &record.text);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Entry {
    key: String,
    value: String,
    comments: Vec<String>,
}

fn parse_entries(content: &str) -> Result<Vec<Entry>, FormatError> {
    let mut entries = Vec::new();
    let mut comments = Vec::new();
    let mut lines = strip_bom(content).lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line_no = index + 1;
        let trimmed = raw.trim_start();
        if trimmed.is_empty() {
            comments.clear();
            continue;
        }
        if let Some(comment) = trimmed.strip_prefix('#').or_else(|| trimmed.strip_prefix('!')) {
            comments.push(comment.strip_prefix(' ').unwrap_or(comment).to_string());
            continue;
        }

        let mut logical = trimmed.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key, line_no)?;
        if key.is_empty() {
            return Err(parse_err(FormatTag::Properties, line_no, "empty key"));
        }
        entries.push(Entry {
            key,
            value: unescape(value, line_no)?,
            comments: std::mem::take(&mut comments),
        });
    }
    Ok(entries)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split at the first unescaped `=`, `:` or whitespace. Both halves stay escaped.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str, line_no: usize) -> Result<String, FormatError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let unit = read_hex4(&mut chars, line_no)?;
                let decoded = if (0xD800..0xDC00).contains(&unit) {
                    read_low_surrogate(&mut chars, unit, line_no)?
                } else {
                    char::from_u32(unit)
                };
                out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn read_hex4(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line_no: usize,
) -> Result<u32, FormatError> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.len() != 4 {
        return Err(parse_err(
            FormatTag::Properties,
            line_no,
            "truncated \\u escape",
        ));
    }
    u32::from_str_radix(&digits, 16).map_err(|_| {
        parse_err(
            FormatTag::Properties,
            line_no,
            format!("invalid \\u escape '{digits}'"),
        )
    })
}

fn read_low_surrogate(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    high: u32,
    line_no: usize,
) -> Result<Option<char>, FormatError> {
    if chars.peek() != Some(&'\\') {
        return Ok(None);
    }
    chars.next();
    if chars.next() != Some('u') {
        return Ok(None);
    }
    let low = read_hex4(chars, line_no)?;
    if !(0xDC00..0xE000).contains(&low) {
        return Ok(None);
    }
    Ok(char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn push_comment(out: &mut String, text: &str) {
    out.push_str("# ");
    out.push_str(text);
    out.push('\n');
}

fn push_entry(out: &mut String, key: &str, value: &str) {
    out.push_str(&escape(key, true));
    out.push('=');
    out.push_str(&escape(value, false));
    out.push('\n');
}

fn escape(raw: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            c => out.push(c),
        }
    }
    out
}
