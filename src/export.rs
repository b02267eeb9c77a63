//! Export emitter: materialize a [`ConsolidatedTable`] into a workbook.
//!
//! With a template, the template's structure (including macro parts of an
//! .xlsm) is kept and only the data region below the header row is
//! replaced, via edit_xlsx. Without one, a fresh styled .xlsx is written
//! with rust_xlsxwriter.

use std::fs::File;
use std::io::{Read, Write as IoWrite};
use std::path::{Path, PathBuf};

use edit_xlsx::Write;
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::info;
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::ConsolidateError;
use crate::types::{ConsolidatedTable, NamingTokens};

/// Where and how to materialize outputs. `template` points at the
/// externally supplied workbook whose data region gets replaced; without
/// it a fresh workbook is created. `out_dir` defaults to the user's
/// Downloads (then Desktop) folder.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub template: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
}

/// Write one brand's table and return the path of the created file.
pub fn write_consolidated(
    table: &ConsolidatedTable,
    tokens: &NamingTokens,
    options: &ExportOptions,
) -> Result<PathBuf, ConsolidateError> {
    let out_dir = match &options.out_dir {
        Some(dir) => dir.clone(),
        None => dirs::download_dir()
            .or_else(dirs::desktop_dir)
            .ok_or_else(|| export_err("could not find Downloads or Desktop folder"))?,
    };
    std::fs::create_dir_all(&out_dir)?;

    let path = match &options.template {
        Some(template) => {
            let ext = template
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("xlsx");
            let path = unique_path(&out_dir, &tokens.file_name(ext));
            write_into_template(table, template, &path)?;
            path
        }
        None => {
            let path = unique_path(&out_dir, &tokens.file_name("xlsx"));
            write_fresh(table, &path).map_err(|e| export_err(e))?;
            path
        }
    };
    info!(brand = %table.brand, path = %path.display(), rows = table.rows.len(), "wrote consolidated workbook");
    Ok(path)
}

fn export_err(reason: impl ToString) -> ConsolidateError {
    ConsolidateError::Export(reason.to_string())
}

/// Suffix the file name with a counter when the target already exists,
/// so re-running a consolidation never clobbers an earlier export.
fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let mut path = dir.join(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    let mut counter = 2u32;
    while path.exists() {
        path = dir.join(format!("{}_{}.{}", stem, counter, ext));
        counter += 1;
    }
    path
}

/// Copy the template, replace everything below its header row with the
/// table's rows, and save under `out_path`. Data starts at row 2; the
/// template's row 1 header and all other parts stay untouched.
fn write_into_template(
    table: &ConsolidatedTable,
    template: &Path,
    out_path: &Path,
) -> Result<(), ConsolidateError> {
    if !template.exists() {
        return Err(export_err(format!(
            "template not found: {}",
            template.display()
        )));
    }
    let mut workbook = edit_xlsx::Workbook::from_path(template)
        .map_err(|e| export_err(format!("could not open template: {}", e)))?;
    let worksheet = workbook
        .get_worksheet_mut(1)
        .map_err(|e| export_err(format!("template has no worksheet: {}", e)))?;

    let stale_max_row = worksheet.max_row();
    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_number = row_idx as u32 + 2;
        for (col_idx, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", col_index_to_letter(col_idx as u32), row_number);
            worksheet
                .write_string(&cell_ref, sanitize_cell(&cell.to_cell_string()))
                .map_err(|e| export_err(e))?;
        }
    }

    // Blank out whatever previous data region extended beyond ours.
    let first_free = table.rows.len() as u32 + 2;
    for row_number in first_free..=stale_max_row {
        for col_idx in 0..table.columns.len() {
            let cell_ref = format!("{}{}", col_index_to_letter(col_idx as u32), row_number);
            worksheet
                .write_string(&cell_ref, String::new())
                .map_err(|e| export_err(e))?;
        }
    }

    workbook
        .save_as(out_path)
        .map_err(|e| export_err(format!("cannot write to file: {}", e)))?;
    strip_drawings(out_path)?;
    Ok(())
}

/// Fresh workbook: styled header row from the table's columns, then data.
fn write_fresh(table: &ConsolidatedTable, out_path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Inventario")?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(rust_xlsxwriter::Color::RGB(0x2563EB))
        .set_font_color(rust_xlsxwriter::Color::RGB(0xFFFFFF));

    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name.as_str(), &header_format)?;
        worksheet.set_column_width(col as u16, column_width(table, col))?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            match cell {
                crate::types::CellValue::Number(n) => {
                    worksheet.write_number((row_idx + 1) as u32, col_idx as u16, *n)?;
                }
                other => {
                    let text = sanitize_cell(&other.to_cell_string());
                    worksheet.write_string((row_idx + 1) as u32, col_idx as u16, text)?;
                }
            }
        }
    }
    let _ = worksheet.set_freeze_panes(1, 0);
    workbook.save(out_path)?;
    Ok(())
}

/// Column width from the longest value in the column, clamped 10-50.
fn column_width(table: &ConsolidatedTable, col: usize) -> f64 {
    let mut width = estimate_text_width(&table.columns[col]);
    for row in &table.rows {
        if let Some(cell) = row.get(col) {
            let w = estimate_text_width(&cell.to_cell_string());
            if w > width {
                width = w;
            }
        }
    }
    width
}

fn estimate_text_width(text: &str) -> f64 {
    (text.chars().count() as f64 * 1.2).clamp(10.0, 50.0)
}

/// Column index to Excel letter (0→A, 1→B, 26→AA).
fn col_index_to_letter(index: u32) -> String {
    let mut n = index;
    let mut s = String::new();
    loop {
        let r = (n % 26) as u8;
        s.insert(0, (b'A' + r) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    s
}

/// Drop control characters and raw XML metacharacters that can corrupt a
/// worksheet part and make Excel report unreadable content.
fn sanitize_cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let u = c as u32;
        if c == '\t' || c == '\n' || c == '\r' {
            out.push(c);
        } else if u < 0x20 || u == 0x7F || u == 0xFFFE || u == 0xFFFF {
            // skip
        } else {
            match c {
                '&' => out.push_str(" y "),
                '<' | '>' => out.push(' '),
                _ => out.push(c),
            }
        }
    }
    out
}

/// Remove drawing and media parts from the saved workbook. edit_xlsx does
/// not round-trip drawing shapes, and a dangling relationship makes Excel
/// prompt "Repairs: Removed Part: Drawing shape" on open. Worksheet XML is
/// copied unchanged.
fn strip_drawings(path: &Path) -> Result<(), ConsolidateError> {
    let file = File::open(path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| export_err(format!("invalid workbook zip: {}", e)))?;

    let temp_path = path.with_extension("tmp");
    let out_file = File::create(&temp_path)?;
    let mut writer = ZipWriter::new(out_file);
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let rel_drawing_re =
        Regex::new(r#"<Relationship[^>]*drawing[^>]*/>"#).expect("rel drawing regex");
    let ct_drawing_re =
        Regex::new(r#"<Override\s+PartName="/xl/drawings/[^"]*"[^>]*/>"#).expect("ct drawing regex");
    let ct_media_re =
        Regex::new(r#"<Override\s+PartName="/xl/media/[^"]*"[^>]*/>"#).expect("ct media regex");

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| export_err(format!("zip entry {}: {}", i, e)))?;
        let name = entry.name().replace('\\', "/");
        if name.starts_with("xl/drawings/") || name.starts_with("xl/media/") {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;

        let data = if name == "[Content_Types].xml" {
            let s = String::from_utf8_lossy(&data);
            let s = ct_drawing_re.replace_all(&s, "");
            ct_media_re.replace_all(&s, "").into_owned().into_bytes()
        } else if name.contains("worksheets/_rels/") && name.ends_with(".rels") {
            let s = String::from_utf8_lossy(&data);
            rel_drawing_re.replace_all(&s, "").into_owned().into_bytes()
        } else {
            data
        };
        writer
            .start_file(name.as_str(), opts)
            .map_err(|e| export_err(e))?;
        writer.write_all(&data)?;
    }
    writer.finish().map_err(|e| export_err(e))?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use calamine::{open_workbook_auto, DataType, Reader};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample_table() -> ConsolidatedTable {
        ConsolidatedTable {
            brand: "Acme".into(),
            columns: vec!["Mes".into(), "Marca".into(), "Cajas_1".into(), "Fecha_1".into()],
            rows: vec![
                vec![text("Enero"), text("Acme"), CellValue::Number(3.0), text("2024-01-05")],
                vec![text("Enero"), text("Acme"), CellValue::Empty, CellValue::Empty],
            ],
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "consolidador_{}_{}",
            tag,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn tokens() -> NamingTokens {
        NamingTokens {
            route: "R1".into(),
            brand: "Acme".into(),
            month: "Enero".into(),
            year: "2025".into(),
        }
    }

    #[test]
    fn letters_extend_past_z() {
        assert_eq!(col_index_to_letter(0), "A");
        assert_eq!(col_index_to_letter(25), "Z");
        assert_eq!(col_index_to_letter(26), "AA");
    }

    #[test]
    fn sanitize_drops_control_chars() {
        assert_eq!(sanitize_cell("a\u{0007}b<c&d"), "ab c y d");
    }

    #[test]
    fn unique_path_appends_counter() {
        let dir = temp_dir("unique");
        let first = unique_path(&dir, "salida.xlsx");
        std::fs::write(&first, b"x").unwrap();
        let second = unique_path(&dir, "salida.xlsx");
        assert_eq!(second.file_name().unwrap(), "salida_2.xlsx");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn fresh_export_round_trips_rows() {
        let dir = temp_dir("fresh");
        let options = ExportOptions {
            template: None,
            out_dir: Some(dir.clone()),
        };
        let path = write_consolidated(&sample_table(), &tokens(), &options).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "R1_Inventario_Acme_Enero_2025.xlsx"
        );

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .unwrap()
            .iter()
            .map(|c| c.as_string().unwrap_or_default())
            .collect();
        assert_eq!(header, vec!["Mes", "Marca", "Cajas_1", "Fecha_1"]);
        assert_eq!(rows.count(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn template_export_replaces_data_region() {
        let dir = temp_dir("template");

        // Template: header row plus stale data that must disappear.
        let template_path = dir.join("plantilla_base.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in ["Mes", "Marca", "Cajas_1", "Fecha_1"].iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        for row in 1..=5u32 {
            sheet.write_string(row, 0, "viejo").unwrap();
        }
        workbook.save(&template_path).unwrap();

        let options = ExportOptions {
            template: Some(template_path),
            out_dir: Some(dir.clone()),
        };
        let path = write_consolidated(&sample_table(), &tokens(), &options).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "R1_Inventario_Acme_Enero_2025.xlsx"
        );

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(|c| c.as_string().unwrap_or_default()).collect())
            .collect();
        assert_eq!(cells[0][0], "Mes");
        assert_eq!(cells[1][1], "Acme");
        assert_eq!(cells[1][3], "2024-01-05");
        assert!(cells.iter().all(|row| !row.contains(&"viejo".to_string())));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
