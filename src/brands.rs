//! Brand detection across the parsed batch: which distinct brand values
//! exist, and which source files contributed each one.

use std::collections::BTreeMap;

use crate::types::RawTable;

/// Brand -> ordered list of distinct contributing file names.
///
/// Brand values are compared by exact equality; no case or whitespace
/// normalization happens here. If the surrounding system ever wants
/// "ACME" and "Acme" merged, that has to be an explicit step at this
/// boundary.
#[derive(Debug, Default)]
pub struct BrandIndex {
    members: BTreeMap<String, Vec<String>>,
}

impl BrandIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: &[RawTable]) -> Self {
        let mut index = Self::new();
        for table in tables {
            index.observe(table);
        }
        index
    }

    /// Record every non-empty brand value in the table's Marca column.
    pub fn observe(&mut self, table: &RawTable) {
        let marca = table.base_idx[2];
        for row in &table.rows {
            let Some(brand) = row.get(marca).and_then(|c| c.brand_key()) else {
                continue;
            };
            let files = self.members.entry(brand).or_default();
            if !files.iter().any(|f| f == &table.source) {
                files.push(table.source.clone());
            }
        }
    }

    /// Distinct brands in lexicographic order, for presentation.
    pub fn brands(&self) -> Vec<&str> {
        self.members.keys().map(String::as_str).collect()
    }

    pub fn files_for(&self, brand: &str) -> &[String] {
        self.members.get(brand).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Per-source configuration only makes sense when more than one file
    /// contributed records for the brand.
    pub fn allows_per_source(&self, brand: &str) -> bool {
        self.files_for(brand).len() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
