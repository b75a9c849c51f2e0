//! Excel workbook parsing (legacy .xls and modern .xlsx)

use crate::error::{KoiError, Result, UnreadableKind};
use calamine::{Data, Range, Reader, Xls, Xlsx};
use polars::prelude::*;
use std::io::Cursor;

/// Parse a modern (.xlsx) workbook from raw bytes
pub fn read_xlsx(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook = Xlsx::new(Cursor::new(bytes)).map_err(|e| {
        KoiError::unreadable(
            UnreadableKind::CorruptBinary,
            format!("xlsx reader rejected input: {e}"),
        )
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            KoiError::unreadable(UnreadableKind::NotTabular, "workbook has no sheets")
        })?
        .map_err(|e| {
            KoiError::unreadable(
                UnreadableKind::CorruptBinary,
                format!("xlsx sheet unreadable: {e}"),
            )
        })?;

    range_to_frame(&range)
}

/// Parse a legacy (.xls) workbook from raw bytes
pub fn read_xls(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook = Xls::new(Cursor::new(bytes)).map_err(|e| {
        KoiError::unreadable(
            UnreadableKind::CorruptBinary,
            format!("xls reader rejected input: {e}"),
        )
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            KoiError::unreadable(UnreadableKind::NotTabular, "workbook has no sheets")
        })?
        .map_err(|e| {
            KoiError::unreadable(
                UnreadableKind::CorruptBinary,
                format!("xls sheet unreadable: {e}"),
            )
        })?;

    range_to_frame(&range)
}

/// Convert a worksheet cell range into a DataFrame.
///
/// The first row is taken as the header. A column becomes Float64 when
/// every present cell is numeric (or a numeric-looking string), otherwise
/// it is kept as text.
fn range_to_frame(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();

    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(cell_to_name).collect(),
        None => {
            return Err(KoiError::EmptyDataset(
                "workbook sheet contains no cells".to_string(),
            ))
        }
    };

    let body: Vec<&[Data]> = rows.collect();
    let n_rows = body.len();

    let mut columns: Vec<Column> = Vec::with_capacity(header.len());
    for (idx, name) in header.iter().enumerate() {
        let mut numeric: Vec<Option<f64>> = Vec::with_capacity(n_rows);
        let mut all_numeric = true;

        for row in &body {
            match row.get(idx).map(cell_to_number) {
                Some(Ok(value)) => numeric.push(value),
                Some(Err(())) => {
                    all_numeric = false;
                    break;
                }
                None => numeric.push(None),
            }
        }

        let column = if all_numeric {
            Column::new(name.as_str().into(), numeric)
        } else {
            let text: Vec<Option<String>> = body
                .iter()
                .map(|row| row.get(idx).and_then(cell_to_text))
                .collect();
            Column::new(name.as_str().into(), text)
        };
        columns.push(column);
    }

    DataFrame::new(columns).map_err(|e| KoiError::DataError(e.to_string()))
}

fn cell_to_name(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Ok(Some) for a numeric value, Ok(None) for an empty cell, Err for text
fn cell_to_number(cell: &Data) -> std::result::Result<Option<f64>, ()> {
    match cell {
        Data::Empty => Ok(None),
        Data::Float(f) => Ok(Some(*f)),
        Data::Int(i) => Ok(Some(*i as f64)),
        Data::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Data::DateTime(dt) => Ok(Some(dt.as_f64())),
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed.parse::<f64>().map(Some).map_err(|_| ())
            }
        }
        Data::Error(_) => Ok(None),
        _ => Err(()),
    }
}

fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::Error(_) => None,
        other => Some(format!("{other}")),
    }
}
