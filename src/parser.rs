//! Source table parsing: one uploaded workbook in, one validated
//! [`RawTable`] out. A file that fails here is reported and skipped; it
//! never aborts the rest of the batch (see `run.rs`).

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, DataType, Range, Reader, Sheets};

use crate::error::ConsolidateError;
use crate::types::{CellValue, RawTable};

/// Required columns of the collection template, in canonical order.
pub const BASE_COLUMNS: [&str; 5] = [
    "Nombre Comercial",
    "Tipo de cliente",
    "Marca",
    "Codigo de producto",
    "Descripción",
];

/// Substring markers for the variable-width box/date column pairs.
/// Matching is case-sensitive on trimmed header names.
pub const BOX_MARKER: &str = "Cajas";
pub const DATE_MARKER: &str = "Fecha";

/// Parse a workbook from disk. The file name (without directory) becomes
/// the table's source tag.
pub fn parse_source_path(path: &Path) -> Result<RawTable, ConsolidateError> {
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ConsolidateError::unreadable(&source, e))?;
    let range = first_sheet_range(&mut workbook, &source)?;
    range_to_table(&source, &range)
}

/// Parse a workbook from uploaded bytes. `name` is the uploaded file name
/// and becomes the origin tag of every record from this table.
pub fn parse_source(name: &str, bytes: &[u8]) -> Result<RawTable, ConsolidateError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ConsolidateError::unreadable(name, e))?;
    let range = first_sheet_range(&mut workbook, name)?;
    range_to_table(name, &range)
}

fn first_sheet_range<RS: std::io::Read + std::io::Seek>(
    workbook: &mut Sheets<RS>,
    source: &str,
) -> Result<Range<Data>, ConsolidateError> {
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ConsolidateError::unreadable(source, "workbook has no sheets"))?
        .map_err(|e| ConsolidateError::unreadable(source, e))
}

fn range_to_table(source: &str, range: &Range<Data>) -> Result<RawTable, ConsolidateError> {
    let mut row_iter = range.rows();
    let header_row = row_iter
        .next()
        .ok_or_else(|| ConsolidateError::unreadable(source, "sheet is empty"))?;

    // Headers are trimmed before validation; files with sloppy header
    // whitespace are common.
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| c.as_string().unwrap_or_default().trim().to_string())
        .collect();

    let missing: Vec<String> = BASE_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConsolidateError::MissingRequiredColumns {
            file: source.to_string(),
            columns: missing,
        });
    }

    let mut base_idx = [0usize; 5];
    for (slot, col) in BASE_COLUMNS.iter().enumerate() {
        // Unwrap is safe: presence was just validated.
        base_idx[slot] = headers.iter().position(|h| h == col).unwrap();
    }

    let box_cols: Vec<usize> = column_positions(&headers, BOX_MARKER);
    let date_cols: Vec<usize> = column_positions(&headers, DATE_MARKER);
    // Positional pairing, truncated to the shorter list: 3 box columns and
    // 5 date columns yield exactly 3 pairs.
    let pairs: Vec<(usize, usize)> = box_cols.into_iter().zip(date_cols).collect();

    let rows: Vec<Vec<CellValue>> = row_iter
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| row.iter().map(CellValue::from).collect())
        .collect();

    Ok(RawTable {
        source: source.to_string(),
        headers,
        base_idx,
        pairs,
        rows,
    })
}

fn column_positions(headers: &[String], marker: &str) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(marker))
        .map(|(i, _)| i)
        .collect()
}
