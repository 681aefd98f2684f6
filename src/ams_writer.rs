//! AMS file emission.
//!
//! The AMS import is an `.xlsx` workbook with a single sheet: a bold header row
//! in contract order, then one row per output row. A CSV rendition with the
//! same header is available for tooling that prefers text.

use crate::error::{AmsError, Result};
use crate::model::{CellValue, OutputRow};
use crate::projector::OUTPUT_COLUMNS;
use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::io::Write;
use std::path::Path;

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Largest integer an Excel number cell holds exactly.
const MAX_EXACT_INTEGER: u64 = 1 << 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Csv,
}

impl OutputFormat {
    /// Format implied by a file name's extension.
    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "xlsx" => Some(OutputFormat::Xlsx),
                "csv" => Some(OutputFormat::Csv),
                _ => None,
            })
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => XLSX_CONTENT_TYPE,
            OutputFormat::Csv => CSV_CONTENT_TYPE,
        }
    }
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &CellValue, formats: &CellFormats) -> Result<()> {
    match value {
        CellValue::Text(s) => sheet.write_string(row, col, s)?,
        CellValue::Integer(i) if i.unsigned_abs() <= MAX_EXACT_INTEGER => sheet.write_number(row, col, *i as f64)?,
        CellValue::Integer(i) => sheet.write_string(row, col, i.to_string())?,
        CellValue::Float(f) => sheet.write_number(row, col, *f)?,
        CellValue::Boolean(b) => sheet.write_boolean(row, col, *b)?,
        CellValue::Date(d) => sheet.write_datetime_with_format(row, col, d, &formats.date)?,
        CellValue::DateTime(dt) => sheet.write_datetime_with_format(row, col, dt, &formats.datetime)?,
    };
    Ok(())
}

struct CellFormats {
    header: Format,
    date: Format,
    datetime: Format,
}

impl CellFormats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

fn build_workbook(rows: &[OutputRow]) -> Result<Workbook> {
    let formats = CellFormats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in OUTPUT_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &formats.header)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let excel_row = u32::try_from(idx + 1)
            .map_err(|_| AmsError::Spreadsheet(format!("{} rows exceed the sheet size", rows.len())))?;
        for (col, value) in row.cells().into_iter().enumerate() {
            if let Some(value) = value {
                write_cell(sheet, excel_row, col as u16, value, &formats)?;
            }
        }
    }

    Ok(workbook)
}

/// Render the AMS workbook in memory.
pub fn xlsx_bytes(rows: &[OutputRow]) -> Result<Vec<u8>> {
    Ok(build_workbook(rows)?.save_to_buffer()?)
}

/// Write the AMS file as CSV. The header row is always written, even when
/// there are no output rows.
pub fn write_csv<W: Write>(rows: &[OutputRow], out: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(OUTPUT_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_bytes(rows: &[OutputRow], format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Xlsx => xlsx_bytes(rows),
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            write_csv(rows, &mut buf)?;
            Ok(buf)
        }
    }
}

/// Write the AMS file, choosing the format from the path's extension.
pub fn write_ams_file(path: &Path, rows: &[OutputRow]) -> Result<()> {
    let format = path
        .to_str()
        .and_then(OutputFormat::from_name)
        .ok_or_else(|| AmsError::UnsupportedFormat(path.display().to_string()))?;

    match format {
        OutputFormat::Xlsx => build_workbook(rows)?.save(path)?,
        OutputFormat::Csv => write_csv(rows, std::io::BufWriter::new(std::fs::File::create(path)?))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet;
    use crate::table::cell_from_any;
    use chrono::NaiveDate;

    fn sample_row() -> OutputRow {
        OutputRow {
            phone: Some(CellValue::from("555-1")),
            sales_order_number: Some(CellValue::from("SO100")),
            item_code: Some(CellValue::from("00123")),
            quantity: Some(CellValue::Float(2.0)),
            ship_delivery_instructions: Some(CellValue::from("Leave at dock, rear")),
            ..Default::default()
        }
    }

    #[test]
    fn test_output_format_from_name() {
        assert_eq!(OutputFormat::from_name("AMS_Order.xlsx"), Some(OutputFormat::Xlsx));
        assert_eq!(OutputFormat::from_name("out.CSV"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_name("out.xls"), None);
        assert_eq!(OutputFormat::default().content_type(), XLSX_CONTENT_TYPE);
    }

    #[test]
    fn test_csv_header_only_for_empty_output() {
        let bytes = to_bytes(&[], OutputFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.trim_end(), OUTPUT_COLUMNS.join(","));
    }

    #[test]
    fn test_csv_rows_follow_contract_order() {
        let text = String::from_utf8(to_bytes(&[sample_row()], OutputFormat::Csv).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "555-1,SO100,,00123,,2,,,,,,,,\"Leave at dock, rear\",");
    }

    #[test]
    fn test_header_matches_serde_names() {
        // Serializing with headers must produce the same header as the contract.
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(OutputRow::default()).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text.lines().next().unwrap(), OUTPUT_COLUMNS.join(","));
    }

    #[test]
    fn test_workbook_reads_back_in_contract_order() {
        let mut dated = sample_row();
        dated.date_of_order = Some(CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));

        let bytes = to_bytes(&[sample_row(), dated], OutputFormat::Xlsx).unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));

        let df = spreadsheet::read_bytes("AMS_Order.xlsx", &bytes).unwrap();
        assert_eq!(df.get_column_names(), OUTPUT_COLUMNS.to_vec());
        assert_eq!(df.height(), 2);

        let value = |column: &str, row: usize| cell_from_any(df.column(column).unwrap().get(row).unwrap());
        assert_eq!(value("Sales Order Number", 0), Some(CellValue::from("SO100")));
        assert_eq!(value("Item_Code", 1), Some(CellValue::from("00123")));
        assert_eq!(value("Quantity", 0).map(|c| c.to_string()), Some("2".to_string()));
        assert_eq!(value("Ship_Delivery Instructions", 0), Some(CellValue::from("Leave at dock, rear")));
        assert_eq!(value("Ship_City", 0), None);
    }

    #[test]
    fn test_empty_workbook_still_has_header() {
        let bytes = xlsx_bytes(&[]).unwrap();
        let df = spreadsheet::read_bytes("AMS_Order.xlsx", &bytes).unwrap();
        assert_eq!(df.get_column_names(), OUTPUT_COLUMNS.to_vec());
        assert_eq!(df.height(), 0);
    }

    #[test]
    fn test_write_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("AMS_Order.xlsx");
        write_ams_file(&xlsx, &[sample_row()]).unwrap();
        assert!(std::fs::read(&xlsx).unwrap().starts_with(b"PK"));

        let csv = dir.path().join("AMS_Order.csv");
        write_ams_file(&csv, &[sample_row()]).unwrap();
        assert!(std::fs::read_to_string(&csv).unwrap().starts_with("Phone,"));

        let err = write_ams_file(&dir.path().join("AMS_Order.txt"), &[]).unwrap_err();
        assert!(matches!(err, AmsError::UnsupportedFormat(_)));
    }
}
