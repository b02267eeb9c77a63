//! Per-brand inventory consolidation.
//!
//! Takes a batch of uploaded template workbooks (each carrying the five
//! base columns plus a variable number of "Cajas"/"Fecha" column pairs),
//! detects the brands present, and emits one finalized workbook per
//! selected brand: records filtered by brand, dates normalized to
//! `YYYY-MM-DD`, client metadata merged in (uniformly or per source
//! file), columns in the fixed client order.
//!
//! The interactive form layer, the template artifact itself, and session
//! state live outside this crate. The core is a pure computation over
//! explicit inputs: parsed tables, a brand selection, and a configuration
//! map; see [`run`].

mod brands;
mod config;
mod consolidate;
mod dates;
mod error;
mod export;
mod flatten;
mod parser;
mod run;
mod types;

pub use brands::BrandIndex;
pub use config::{
    BrandConfig, ConfigEntry, Month, MULTI_MONTH, MULTI_ROUTE, MULTI_YEAR, YEAR_MAX, YEAR_MIN,
};
pub use consolidate::{consolidate, CONFIG_COLUMNS, MAX_OUTPUT_PAIRS};
pub use error::ConsolidateError;
pub use export::{write_consolidated, ExportOptions};
pub use flatten::flatten;
pub use parser::{parse_source, parse_source_path, BASE_COLUMNS, BOX_MARKER, DATE_MARKER};
pub use run::{
    consolidate_batch, parse_batch, run, BrandFailure, BrandOutput, RunReport, SourceFailure,
    SourceInput,
};
pub use types::{CellValue, ConsolidatedTable, FlatRecord, NamingTokens, RawTable};
