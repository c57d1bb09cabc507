//! Upload decoding: turns CSV/spreadsheet bytes into raw rows.
//!
//! A raw row is an ordered mapping of column name to cell text with no fixed
//! schema; column names vary across uploads and are matched downstream
//! against a synonym table.

mod aggregate;
mod normalize;

pub use aggregate::aggregate;
pub use normalize::normalize;

use crate::analysis::error::{AnalysisError, ACCEPTED_EXTENSIONS};
use calamine::{open_workbook_auto_from_rs, DataType, Reader};
use std::io::Cursor;
use tracing::{debug, info};

/// One decoded spreadsheet/CSV row: column name -> cell text, in file order.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    columns: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.columns.push((key.into(), value.into()));
    }

    /// Returns the first non-empty cell whose normalized column name matches
    /// any of the given canonical names.
    pub fn get_any(&self, names: &[&str]) -> Option<&str> {
        self.columns.iter().find_map(|(key, value)| {
            let key = normalize_key(key);
            if names.iter().any(|n| *n == key) && !value.trim().is_empty() {
                Some(value.trim())
            } else {
                None
            }
        })
    }

    /// Iterates over (normalized key, cell text) pairs in file order.
    pub fn normalized_columns(&self) -> impl Iterator<Item = (String, &str)> {
        self.columns
            .iter()
            .map(|(key, value)| (normalize_key(key), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// Canonicalizes a column name: trimmed, lowercased, whitespace collapsed
/// to single underscores.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Decodes an uploaded file into raw rows based on its extension.
///
/// The extension gate is the only file-type check; anything outside the
/// accepted set is a user-facing error naming the detected extension.
pub fn decode_rows(extension: &str, bytes: &[u8]) -> Result<Vec<RawRow>, AnalysisError> {
    let ext = extension.trim_start_matches('.').to_lowercase();
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AnalysisError::UnsupportedFileType { extension: ext });
    }

    let rows = match ext.as_str() {
        "csv" => decode_csv(bytes)?,
        _ => decode_workbook(bytes)?,
    };

    info!(rows = rows.len(), extension = %ext, "Decoded upload");
    Ok(rows)
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<RawRow>, AnalysisError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = RawRow::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.push(header, cell);
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn decode_workbook(bytes: &[u8]) -> Result<Vec<RawRow>, AnalysisError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AnalysisError::Decode {
            message: "workbook contains no sheets".to_string(),
        })?;
    debug!(sheet = %sheet_name, "Reading first worksheet");

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| AnalysisError::Decode {
            message: format!("sheet \"{sheet_name}\" has no data"),
        })?
        .map_err(|e| AnalysisError::Decode {
            message: e.to_string(),
        })?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(header_row) => header_row.iter().map(cell_to_string).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for cells in row_iter {
        let mut row = RawRow::new();
        for (header, cell) in headers.iter().zip(cells.iter()) {
            row.push(header.clone(), cell_to_string(cell));
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::String(s) => s.trim().to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) => format_float(*f),
        DataType::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Renders whole numbers without a trailing ".0" so they coerce cleanly.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Student Name"), "student_name");
        assert_eq!(normalize_key("  FULL  NAME "), "full_name");
        assert_eq!(normalize_key("SS1_1st"), "ss1_1st");
    }

    #[test]
    fn test_decode_csv_basic() {
        let data = b"Name,Subject,SS1_1st\nAda,Mathematics,80\nObi,Physics,75\n";
        let rows = decode_rows("csv", data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_any(&["name"]), Some("Ada"));
        assert_eq!(rows[1].get_any(&["subject"]), Some("Physics"));
    }

    #[test]
    fn test_decode_csv_skips_blank_rows() {
        let data = b"Name,Score\nAda,80\n,\n";
        let rows = decode_rows("csv", data).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_unsupported_extension_is_named() {
        let err = decode_rows("pdf", b"whatever").unwrap_err();
        match err {
            AnalysisError::UnsupportedFileType { extension } => {
                assert_eq!(extension, "pdf");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extension_gate_is_case_insensitive() {
        let data = b"Name\nAda\n";
        assert!(decode_rows("CSV", data).is_ok());
        assert!(decode_rows(".csv", data).is_ok());
    }

    #[test]
    fn test_format_float_trims_whole_numbers() {
        assert_eq!(format_float(80.0), "80");
        assert_eq!(format_float(72.5), "72.5");
    }
}
