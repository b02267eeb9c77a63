//! Row flattening: every validated table row becomes exactly one
//! [`FlatRecord`], tagged with its origin file.

use crate::types::{CellValue, FlatRecord, RawTable};

/// One record per source row, in row order. Base cells are copied
/// verbatim; box/date cells are copied under their positional pair index.
/// Rows with zero or empty box counts are kept.
pub fn flatten(table: &RawTable) -> Vec<FlatRecord> {
    table
        .rows
        .iter()
        .map(|row| {
            let cell = |idx: usize| row.get(idx).cloned().unwrap_or(CellValue::Empty);
            FlatRecord {
                origin: table.source.clone(),
                base: [
                    cell(table.base_idx[0]),
                    cell(table.base_idx[1]),
                    cell(table.base_idx[2]),
                    cell(table.base_idx[3]),
                    cell(table.base_idx[4]),
                ],
                pairs: table
                    .pairs
                    .iter()
                    .map(|&(boxes, date)| (cell(boxes), cell(date)))
                    .collect(),
            }
        })
        .collect()
}
