//! The consolidation step: filter the flattened records of one brand,
//! normalize their date cells, merge in the resolved configuration, and
//! lay the result out in the canonical column order.

use tracing::debug;

use crate::config::BrandConfig;
use crate::error::ConsolidateError;
use crate::parser::BASE_COLUMNS;
use crate::types::{CellValue, ConsolidatedTable, FlatRecord};
use crate::dates;

/// Output caps at four box/date pairs regardless of how many the inputs
/// carried; fewer are simply omitted.
pub const MAX_OUTPUT_PAIRS: usize = 4;

/// Configuration columns, in output order. Año is used for file naming
/// only and never becomes a column.
pub const CONFIG_COLUMNS: [&str; 5] = [
    "Mes",
    "Ruta",
    "Zona",
    "Codigo de cliente",
    "Nombre de la tienda",
];

/// Build the finalized table for one brand.
///
/// Returns `Ok(None)` when no record matches the brand: a selected brand
/// with no records is silently skipped, never an error. Rows whose origin
/// has no configuration entry should have been caught by
/// [`BrandConfig::validate`]; they still fail here rather than emit a row
/// with missing fields.
pub fn consolidate(
    records: &[FlatRecord],
    brand: &str,
    config: &BrandConfig,
) -> Result<Option<ConsolidatedTable>, ConsolidateError> {
    let matched: Vec<&FlatRecord> = records
        .iter()
        .filter(|r| r.brand().as_deref() == Some(brand))
        .collect();
    if matched.is_empty() {
        debug!(brand, "no records after filtering, skipping brand");
        return Ok(None);
    }

    let pair_count = matched
        .iter()
        .map(|r| r.pairs.len())
        .max()
        .unwrap_or(0)
        .min(MAX_OUTPUT_PAIRS);

    let mut columns: Vec<String> = CONFIG_COLUMNS
        .iter()
        .chain(BASE_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect();
    for i in 1..=pair_count {
        columns.push(format!("Cajas_{i}"));
        columns.push(format!("Fecha_{i}"));
    }

    let mut rows = Vec::with_capacity(matched.len());
    for record in matched {
        let entry = config.resolve(&record.origin).ok_or_else(|| {
            ConsolidateError::UnknownOrigin {
                brand: brand.to_string(),
                file: record.origin.clone(),
            }
        })?;

        let mut row: Vec<CellValue> = Vec::with_capacity(columns.len());
        row.push(CellValue::Text(entry.month.as_str().to_string()));
        row.push(CellValue::Text(entry.route.clone()));
        row.push(CellValue::Text(entry.zone.clone()));
        row.push(CellValue::Text(entry.client_code.clone()));
        row.push(CellValue::Text(entry.store_name.clone()));
        row.extend(record.base.iter().cloned());
        for i in 0..pair_count {
            // Records from files with fewer pairs pad out with empty cells.
            let (boxes, date) = record
                .pairs
                .get(i)
                .cloned()
                .unwrap_or((CellValue::Empty, CellValue::Empty));
            row.push(boxes);
            row.push(dates::normalize(&date));
        }
        rows.push(row);
    }

    Ok(Some(ConsolidatedTable {
        brand: brand.to_string(),
        columns,
        rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrandConfig, ConfigEntry, Month};
    use std::collections::BTreeMap;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn entry(route: &str, zone: &str) -> ConfigEntry {
        ConfigEntry {
            month: Month::Enero,
            route: route.to_string(),
            client_code: "C-1".to_string(),
            year: 2025,
            zone: zone.to_string(),
            store_name: "Tienda".to_string(),
        }
    }

    fn record(origin: &str, brand: &str, pairs: Vec<(CellValue, CellValue)>) -> FlatRecord {
        FlatRecord {
            origin: origin.to_string(),
            base: [
                text("Comercial"),
                text("Mayorista"),
                text(brand),
                text("P-1"),
                text("Desc"),
            ],
            pairs,
        }
    }

    fn uniform() -> BrandConfig {
        BrandConfig::Uniform {
            entry: entry("R1", "Norte"),
        }
    }

    #[test]
    fn filters_by_exact_brand() {
        let records = vec![
            record("a.xlsx", "Acme", vec![]),
            record("a.xlsx", "acme", vec![]),
            record("a.xlsx", "Zenith", vec![]),
        ];
        let table = consolidate(&records, "Acme", &uniform()).unwrap().unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table
            .rows
            .iter()
            .all(|row| row[7] == text("Acme")));
    }

    #[test]
    fn empty_brand_is_skipped_silently() {
        let records = vec![record("a.xlsx", "Acme", vec![])];
        assert!(consolidate(&records, "Nadie", &uniform()).unwrap().is_none());
    }

    #[test]
    fn column_order_is_canonical() {
        let records = vec![record(
            "a.xlsx",
            "Acme",
            vec![(CellValue::Number(3.0), CellValue::DateLike(45292.0))],
        )];
        let table = consolidate(&records, "Acme", &uniform()).unwrap().unwrap();
        assert_eq!(
            table.columns,
            vec![
                "Mes",
                "Ruta",
                "Zona",
                "Codigo de cliente",
                "Nombre de la tienda",
                "Nombre Comercial",
                "Tipo de cliente",
                "Marca",
                "Codigo de producto",
                "Descripción",
                "Cajas_1",
                "Fecha_1",
            ]
        );
    }

    #[test]
    fn dates_normalize_or_go_empty() {
        let records = vec![record(
            "a.xlsx",
            "Acme",
            vec![
                (CellValue::Number(3.0), CellValue::DateLike(45292.0)),
                (CellValue::Empty, text("sin fecha")),
            ],
        )];
        let table = consolidate(&records, "Acme", &uniform()).unwrap().unwrap();
        let row = &table.rows[0];
        assert_eq!(row[11], text("2024-01-01"));
        assert_eq!(row[13], CellValue::Empty);
    }

    #[test]
    fn mixed_pair_widths_pad_not_error() {
        let records = vec![
            record("dos.xlsx", "Acme", vec![
                (CellValue::Number(1.0), text("2024-01-05")),
                (CellValue::Number(2.0), text("2024-01-12")),
            ]),
            record("cuatro.xlsx", "Acme", vec![
                (CellValue::Number(1.0), text("2024-02-02")),
                (CellValue::Number(2.0), text("2024-02-09")),
                (CellValue::Number(3.0), text("2024-02-16")),
                (CellValue::Number(4.0), text("2024-02-23")),
            ]),
        ];
        let mut entries = BTreeMap::new();
        entries.insert("dos.xlsx".to_string(), entry("R1", "Norte"));
        entries.insert("cuatro.xlsx".to_string(), entry("R2", "Sur"));
        let config = BrandConfig::PerSource { entries };

        let table = consolidate(&records, "Acme", &config).unwrap().unwrap();
        assert!(table.columns.contains(&"Cajas_4".to_string()));
        let short_row = &table.rows[0];
        assert_eq!(short_row[14], CellValue::Empty); // Cajas_3
        assert_eq!(short_row[15], CellValue::Empty); // Fecha_3
        assert_eq!(short_row[16], CellValue::Empty); // Cajas_4
    }

    #[test]
    fn pairs_beyond_four_are_dropped() {
        let pairs: Vec<_> = (1..=5)
            .map(|i| (CellValue::Number(i as f64), text("2024-01-01")))
            .collect();
        let records = vec![record("a.xlsx", "Acme", pairs)];
        let table = consolidate(&records, "Acme", &uniform()).unwrap().unwrap();
        assert!(table.columns.contains(&"Cajas_4".to_string()));
        assert!(!table.columns.contains(&"Cajas_5".to_string()));
        assert_eq!(table.columns.len(), 10 + 2 * MAX_OUTPUT_PAIRS);
    }

    #[test]
    fn per_source_fields_match_origin_exactly() {
        let records = vec![
            record("a.xlsx", "Acme", vec![]),
            record("b.xlsx", "Acme", vec![]),
        ];
        let mut entries = BTreeMap::new();
        entries.insert("a.xlsx".to_string(), entry("R1", "Norte"));
        entries.insert("b.xlsx".to_string(), entry("R2", "Sur"));
        let config = BrandConfig::PerSource { entries };

        let table = consolidate(&records, "Acme", &config).unwrap().unwrap();
        assert_eq!(table.rows[0][1], text("R1"));
        assert_eq!(table.rows[0][2], text("Norte"));
        assert_eq!(table.rows[1][1], text("R2"));
        assert_eq!(table.rows[1][2], text("Sur"));
    }

    #[test]
    fn unknown_origin_is_a_hard_error() {
        let records = vec![record("misterio.xlsx", "Acme", vec![])];
        let config = BrandConfig::PerSource {
            entries: BTreeMap::new(),
        };
        assert!(matches!(
            consolidate(&records, "Acme", &config),
            Err(ConsolidateError::UnknownOrigin { .. })
        ));
    }

    #[test]
    fn consolidation_is_idempotent() {
        let records = vec![record(
            "a.xlsx",
            "Acme",
            vec![(CellValue::Number(3.0), text("05/01/2024"))],
        )];
        let first = consolidate(&records, "Acme", &uniform()).unwrap().unwrap();
        let second = consolidate(&records, "Acme", &uniform()).unwrap().unwrap();
        assert_eq!(first, second);
    }
}
