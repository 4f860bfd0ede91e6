//! CSV codec.
//!
//! ```text
//! source: key,text,description      (description column optional)
//! target: key,text,hash
//! ```
//!
//! Columns are located by header name, so their order is free.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use locsync_core::{ContentHash, FormatTag, SourceRecord, TargetRecord};

use crate::error::{parse_err, FormatError};
use crate::{strip_bom, RecordFormat};

const SOURCE_HEADER: [&str; 3] = ["key", "text", "description"];
const TARGET_HEADER: [&str; 3] = ["key", "text", "hash"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

impl RecordFormat for CsvFormat {
    fn tag(&self) -> FormatTag {
        FormatTag::Csv
    }

    fn parse_source(&self, content: &str) -> Result<Vec<SourceRecord>, FormatError> {
        read_rows(content, "description", |key, text, description| {
            SourceRecord::new(key, text, description)
        })
    }

    fn parse_target(&self, content: &str) -> Result<Vec<TargetRecord>, FormatError> {
        read_rows(content, "hash", |key, text, hash| {
            TargetRecord::new(key, text, ContentHash::from(hash))
        })
    }

    fn render_source(&self, records: &[SourceRecord]) -> Result<String, FormatError> {
        write_rows(
            SOURCE_HEADER,
            records
                .iter()
                .map(|r| [r.key.as_str(), r.text.as_str(), r.description.as_str()]),
        )
    }

    fn render_target(&self, records: &[TargetRecord]) -> Result<String, FormatError> {
        write_rows(
            TARGET_HEADER,
            records
                .iter()
                .map(|r| [r.key.as_str(), r.text.as_str(), r.hash.as_str()]),
        )
    }
}

fn read_rows<T>(
    content: &str,
    third_column: &str,
    build: impl Fn(&str, &str, &str) -> T,
) -> Result<Vec<T>, FormatError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(strip_bom(content).as_bytes());

    let headers = reader.headers()?.clone();
    let key_col = column(&headers, "key")
        .ok_or_else(|| parse_err(FormatTag::Csv, 1, "missing `key` column"))?;
    let text_col = column(&headers, "text")
        .ok_or_else(|| parse_err(FormatTag::Csv, 1, "missing `text` column"))?;
    let third_col = column(&headers, third_column);

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or_default();
        if row.iter().all(str::is_empty) {
            continue;
        }
        let key = row.get(key_col).unwrap_or_default();
        if key.trim().is_empty() {
            return Err(parse_err(FormatTag::Csv, line, "empty key"));
        }
        let text = row.get(text_col).unwrap_or_default();
        let third = third_col.and_then(|c| row.get(c)).unwrap_or_default();
        rows.push(build(key, text, third));
    }
    Ok(rows)
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn write_rows<'a>(
    header: [&str; 3],
    rows: impl Iterator<Item = [&'a str; 3]>,
) -> Result<String, FormatError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| FormatError::Render {
        format: FormatTag::Csv,
        message: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| FormatError::Render {
        format: FormatTag::Csv,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use locsync_core::content_hash;

    #[test]
    fn parses_source_with_quoted_fields() {
        let content = "key,text,description\n\
                       hello,Hello,greeting\n\
                       list,\"a, b, \"\"c\"\"\",\"multi\nline\"\n";
        let records = CsvFormat.parse_source(content).expect("parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text, "a, b, \"c\"");
        assert_eq!(records[1].description, "multi\nline");
        assert_eq!(records[0].hash(), &content_hash("Hello", "greeting"));
    }

    #[test]
    fn description_column_is_optional_and_order_free() {
        let content = "text,key\nHello,hello\n";
        let records = CsvFormat.parse_source(content).expect("parse");
        assert_eq!(records[0].key, "hello");
        assert_eq!(records[0].description, "");
    }

    #[test]
    fn bom_and_crlf_are_tolerated() {
        let content = "\u{feff}key,text,hash\r\nhello,Bonjour,1a2b3c4d\r\n";
        let records = CsvFormat.parse_target(content).expect("parse");
        assert_eq!(records[0].hash, ContentHash::from("1a2b3c4d"));
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let err = CsvFormat.parse_source("name,text\nx,y\n").unwrap_err();
        assert!(matches!(err, FormatError::Parse { line: 1, .. }));
    }

    #[test]
    fn empty_key_reports_line() {
        let err = CsvFormat
            .parse_source("key,text\nok,Fine\n,Orphan text\n")
            .unwrap_err();
        match err {
            FormatError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn blank_rows_are_skipped() {
        let records = CsvFormat
            .parse_target("key,text,hash\n,,\nhello,Bonjour,00000000\n")
            .expect("parse");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn target_render_is_readable_back() {
        let records = vec![
            TargetRecord::new("bye", "Au revoir", ContentHash::from("0badc0de")),
            TargetRecord::new("quote", "Il a dit \"oui\", puis non", ContentHash::from("12345678")),
        ];
        let rendered = CsvFormat.render_target(&records).expect("render");
        assert!(rendered.starts_with("key,text,hash\n"));
        assert_eq!(CsvFormat.parse_target(&rendered).expect("parse"), records);
    }
}
