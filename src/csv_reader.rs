// 📄 CSV Reader - Sheet export text → rows → records
// Lenient by contract: malformed input degrades, it never fails.

use crate::model::clean_field;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::collections::HashMap;

/// Header name (lower-cased, trimmed) → cleaned cell value
pub type Record = HashMap<String, String>;

/// Field lookup that treats a missing column as blank
pub fn field<'a>(record: &'a Record, key: &str) -> &'a str {
    record.get(key).map(String::as_str).unwrap_or("")
}

/// Parse raw delimited text into rows of fields
///
/// Handles quoted fields with commas and newlines, doubled quotes,
/// `\n` / `\r\n` line endings, and a final row without a trailing newline.
/// An unbalanced quote swallows the rest of the input into one field.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => {
                tracing::warn!(line = line_num + 1, error = %e, "Dropping unreadable CSV record");
            }
        }
    }

    rows
}

/// Convert rows into records keyed by the header row
///
/// Row 0 supplies the keys (lower-cased, trimmed). Entirely blank rows are
/// skipped and every value goes through [`clean_field`].
pub fn rows_to_records(rows: &[Vec<String>]) -> Vec<Record> {
    let Some((header, body)) = rows.split_first() else {
        return Vec::new();
    };

    let keys: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();

    body.iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            keys.iter()
                .enumerate()
                .map(|(i, key)| {
                    let value = row.get(i).map(|v| clean_field(v)).unwrap_or_default();
                    (key.clone(), value)
                })
                .collect()
        })
        .collect()
}

/// Shortcut: raw text straight to records
pub fn parse_records(text: &str) -> Vec<Record> {
    rows_to_records(&parse_csv(text))
}

/// Serialize rows so that [`parse_csv`] reads them back unchanged
///
/// Only fields containing a comma, quote or line break are quoted.
pub fn write_csv(rows: &[Vec<String>]) -> String {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    for row in rows {
        if let Err(e) = writer.write_record(row) {
            tracing::warn!(error = %e, "Failed to serialize CSV row");
        }
    }

    match writer.into_inner() {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => String::from_utf8_lossy(e.into_inner().get_ref()).into_owned(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
