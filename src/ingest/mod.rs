//! Tabular input detection and parsing
//!
//! Turns raw upload bytes into a cleaned DataFrame. Survey exports arrive
//! as delimited text in assorted encodings or as Excel workbooks, and the
//! extension is not always honest, so parsing is an ordered fallback
//! chain with a content-sniffing mode for callers that do not trust the
//! filename at all.

mod decode;
mod workbook;

pub use decode::{decode_text, detect_encoding};
pub use workbook::{read_xls, read_xlsx};

use crate::error::{KoiError, Result, UnreadableKind};
use polars::prelude::*;
use std::io::Cursor;

/// Supported tabular source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    DelimitedText { separator: u8 },
    LegacyWorkbook,
    ModernWorkbook,
}

/// Map a filename extension to a source format, if recognized
pub fn format_for_filename(filename: &str) -> Option<SourceFormat> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".csv") || lower.ends_with(".txt") {
        Some(SourceFormat::DelimitedText { separator: b',' })
    } else if lower.ends_with(".tsv") {
        Some(SourceFormat::DelimitedText { separator: b'\t' })
    } else if lower.ends_with(".xlsx") {
        Some(SourceFormat::ModernWorkbook)
    } else if lower.ends_with(".xls") {
        Some(SourceFormat::LegacyWorkbook)
    } else {
        None
    }
}

/// Parse raw bytes into a cleaned table, using the filename as a hint.
///
/// Legacy workbooks that fail the binary reader are retried as delimited
/// text, since .xls files in the wild are often renamed CSVs. Unknown
/// extensions go through content sniffing.
pub fn read_table(bytes: &[u8], filename: &str) -> Result<DataFrame> {
    let parsed = match format_for_filename(filename) {
        Some(SourceFormat::DelimitedText { separator }) => parse_delimited(bytes, separator)?,
        Some(SourceFormat::ModernWorkbook) => workbook::read_xlsx(bytes)?,
        Some(SourceFormat::LegacyWorkbook) => match workbook::read_xls(bytes) {
            Ok(df) => df,
            Err(KoiError::UnreadableFormat { .. }) => parse_delimited(bytes, b',')?,
            Err(e) => return Err(e),
        },
        None => return sniff_table(bytes),
    };

    normalize(parsed)
}

/// Parse raw bytes without trusting any extension.
///
/// Delimited text is cheapest and by far the most common, so it is tried
/// first, then the legacy workbook reader, then the modern one.
pub fn sniff_table(bytes: &[u8]) -> Result<DataFrame> {
    let parsed = match parse_delimited(bytes, b',') {
        Ok(df) => df,
        Err(_) => match workbook::read_xls(bytes) {
            Ok(df) => df,
            Err(_) => workbook::read_xlsx(bytes).map_err(|_| {
                KoiError::unreadable(
                    UnreadableKind::NotTabular,
                    "content is neither delimited text nor a supported workbook",
                )
            })?,
        },
    };

    normalize(parsed)
}

fn parse_delimited(bytes: &[u8], separator: u8) -> Result<DataFrame> {
    let text = decode_text(bytes)?;

    // Text with embedded NULs is binary data wearing a text extension.
    if text.contains('\u{0}') {
        return Err(KoiError::unreadable(
            UnreadableKind::NotTabular,
            "embedded NUL bytes in delimited-text candidate",
        ));
    }

    let parse_options = CsvParseOptions::default().with_separator(separator);
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(Cursor::new(text.as_bytes()))
        .finish()
        .map_err(|e| {
            KoiError::unreadable(
                UnreadableKind::NotTabular,
                format!("delimited parse failed: {e}"),
            )
        })
}

/// Auto-generated names assigned to header cells that held no real name
fn is_placeholder_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with("Unnamed") {
        return true;
    }
    // polars-style synthetic headers: column_1, column_2, ...
    name.strip_prefix("column_")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Cleanup applied to every parsed table: trim/de-BOM column names, drop
/// placeholder columns, drop rows with no values at all.
fn normalize(mut df: DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Err(KoiError::EmptyDataset("no columns parsed".to_string()));
    }

    let cleaned: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.replace('\u{feff}', "").trim().to_string())
        .collect();
    df.set_column_names(cleaned.iter().map(String::as_str))?;

    let keep: Vec<&str> = cleaned
        .iter()
        .map(String::as_str)
        .filter(|n| !is_placeholder_name(n))
        .collect();
    if keep.is_empty() {
        return Err(KoiError::EmptyDataset(
            "every column has a placeholder name".to_string(),
        ));
    }
    let df = df.select(keep)?;

    let mut all_null: Option<BooleanChunked> = None;
    for col in df.get_columns() {
        let nulls = col.as_materialized_series().is_null();
        all_null = Some(match all_null {
            Some(acc) => &acc & &nulls,
            None => nulls,
        });
    }
    let df = match all_null {
        Some(mask) => {
            let keep_rows = !&mask;
            df.filter(&keep_rows)?
        }
        None => df,
    };

    if df.height() == 0 {
        return Err(KoiError::EmptyDataset(
            "no rows with data after cleaning".to_string(),
        ));
    }

    Ok(df)
}
