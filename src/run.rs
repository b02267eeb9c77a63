//! Batch orchestration for one consolidation run: parse every uploaded
//! file (failures isolated per file), then consolidate and export every
//! selected brand (failures isolated per brand).

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::warn;

use crate::brands::BrandIndex;
use crate::config::BrandConfig;
use crate::consolidate::consolidate;
use crate::error::ConsolidateError;
use crate::export::{write_consolidated, ExportOptions};
use crate::flatten::flatten;
use crate::parser;
use crate::types::{ConsolidatedTable, FlatRecord, RawTable};

/// One uploaded file, either on disk or as the upload's bytes.
#[derive(Debug, Clone)]
pub enum SourceInput {
    Path(PathBuf),
    Bytes { name: String, bytes: Vec<u8> },
}

impl SourceInput {
    fn name(&self) -> String {
        match self {
            SourceInput::Path(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            SourceInput::Bytes { name, .. } => name.clone(),
        }
    }
}

#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: ConsolidateError,
}

#[derive(Debug)]
pub struct BrandFailure {
    pub brand: String,
    pub error: ConsolidateError,
}

#[derive(Debug)]
pub struct BrandOutput {
    pub brand: String,
    pub table: ConsolidatedTable,
    /// Set when an [`ExportOptions`] was supplied and the workbook was
    /// written.
    pub path: Option<PathBuf>,
}

/// Everything one run produced: finished tables, plus the per-file and
/// per-brand failures that were isolated along the way. Nothing in a run
/// escalates past this report.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outputs: Vec<BrandOutput>,
    pub file_failures: Vec<SourceFailure>,
    pub brand_failures: Vec<BrandFailure>,
}

/// Parse every input. A malformed file lands in the failure list and the
/// rest of the batch keeps going.
pub fn parse_batch(inputs: &[SourceInput]) -> (Vec<RawTable>, Vec<SourceFailure>) {
    let mut tables = Vec::new();
    let mut failures = Vec::new();
    for input in inputs {
        let result = match input {
            SourceInput::Path(path) => parser::parse_source_path(path),
            SourceInput::Bytes { name, bytes } => parser::parse_source(name, bytes),
        };
        match result {
            Ok(table) => tables.push(table),
            Err(error) => {
                warn!(source = %input.name(), %error, "skipping source file");
                failures.push(SourceFailure {
                    source: input.name(),
                    error,
                });
            }
        }
    }
    (tables, failures)
}

/// Consolidate the selected brands from already-parsed tables. When
/// `export` is set each finished table is also written out; an export
/// failure counts against its brand only.
pub fn consolidate_batch(
    tables: &[RawTable],
    selections: &[String],
    configs: &BTreeMap<String, BrandConfig>,
    export: Option<&ExportOptions>,
) -> RunReport {
    let index = BrandIndex::from_tables(tables);
    let records: Vec<FlatRecord> = tables.iter().flat_map(|t| flatten(t)).collect();

    let mut report = RunReport::default();
    for brand in selections {
        let Some(config) = configs.get(brand) else {
            report.brand_failures.push(BrandFailure {
                brand: brand.clone(),
                error: ConsolidateError::MissingConfiguration {
                    brand: brand.clone(),
                },
            });
            continue;
        };
        if let Err(error) = config.validate(brand, index.files_for(brand)) {
            report.brand_failures.push(BrandFailure {
                brand: brand.clone(),
                error,
            });
            continue;
        }
        match consolidate(&records, brand, config) {
            Ok(None) => {}
            Ok(Some(table)) => {
                let path = match export {
                    Some(options) => {
                        match write_consolidated(&table, &config.naming_tokens(brand), options) {
                            Ok(path) => Some(path),
                            Err(error) => {
                                report.brand_failures.push(BrandFailure {
                                    brand: brand.clone(),
                                    error,
                                });
                                continue;
                            }
                        }
                    }
                    None => None,
                };
                report.outputs.push(BrandOutput {
                    brand: brand.clone(),
                    table,
                    path,
                });
            }
            Err(error) => report.brand_failures.push(BrandFailure {
                brand: brand.clone(),
                error,
            }),
        }
    }
    report
}

/// Full run over one uploaded batch: parse, consolidate, export.
pub fn run(
    inputs: &[SourceInput],
    selections: &[String],
    configs: &BTreeMap<String, BrandConfig>,
    export: Option<&ExportOptions>,
) -> RunReport {
    let (tables, file_failures) = parse_batch(inputs);
    let mut report = consolidate_batch(&tables, selections, configs, export);
    report.file_failures = file_failures;
    report
}
