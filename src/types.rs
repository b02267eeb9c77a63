use calamine::Data;
use serde::{Deserialize, Serialize};

/// One spreadsheet cell, reduced to the four shapes the pipeline cares about.
///
/// `DateLike` carries the raw Excel serial number of a date-typed cell.
/// ISO date strings arrive as `Text` and are picked up by the string-parse
/// fallback during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    DateLike(f64),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Brand identity for grouping and filtering. Exact value equality:
    /// no trimming, no case folding. Empty cells yield no brand.
    pub fn brand_key(&self) -> Option<String> {
        match self {
            CellValue::Text(s) if !s.is_empty() => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            _ => None,
        }
    }

    /// Display form used when writing a cell out to a workbook.
    pub fn to_cell_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::DateLike(serial) => crate::dates::format_serial(*serial)
                .unwrap_or_else(|| format_number(*serial)),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            Data::DateTime(dt) => CellValue::DateLike(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// Render a float without a trailing ".0" so product codes and box counts
/// read like the source cells did.
pub(crate) fn format_number(f: f64) -> String {
    if f == f.trunc() && f.abs() < i64::MAX as f64 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// One uploaded file parsed into a validated in-memory table.
///
/// `base_idx` holds the column positions of the five required columns in
/// [`crate::parser::BASE_COLUMNS`] order. `pairs` holds (box, date) column
/// positions, paired by order of appearance and truncated to the shorter
/// of the two lists.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: String,
    pub headers: Vec<String>,
    pub base_idx: [usize; 5],
    pub pairs: Vec<(usize, usize)>,
    pub rows: Vec<Vec<CellValue>>,
}

/// One canonical record produced from one source row.
///
/// `base` follows [`crate::parser::BASE_COLUMNS`] order; cells are carried
/// verbatim. Records are never dropped for empty or zero box counts.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub origin: String,
    pub base: [CellValue; 5],
    pub pairs: Vec<(CellValue, CellValue)>,
}

impl FlatRecord {
    pub fn brand(&self) -> Option<String> {
        self.base[2].brand_key()
    }
}

/// Final per-brand table in canonical column order, ready for the emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    pub brand: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Tokens the emitter interpolates into the output file name:
/// `{route}_Inventario_{brand}_{month}_{year}.{ext}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamingTokens {
    pub route: String,
    pub brand: String,
    pub month: String,
    pub year: String,
}

impl NamingTokens {
    pub fn file_name(&self, ext: &str) -> String {
        format!(
            "{}_Inventario_{}_{}_{}.{}",
            self.route, self.brand, self.month, self.year, ext
        )
    }
}
