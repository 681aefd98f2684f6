//! Readers that turn uploaded or on-disk files into `DataFrame`s.
//!
//! Workbooks (`.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`) are read with calamine;
//! only the first worksheet is used and its first row is the header. CSV files
//! are read with polars with every column kept as text, so keys such as
//! `00123` survive exactly as written.

use crate::error::{AmsError, Result};
use crate::model::CellValue;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, DataType as _, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Workbook,
}

impl TableFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" | "txt" => Some(TableFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(TableFormat::Workbook),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Detect from a file name, falling back to the content's magic bytes
    /// (zip for xlsx/ods, OLE for xls).
    pub fn detect(file_name: &str, bytes: &[u8]) -> Option<Self> {
        if let Some(format) = Self::from_path(Path::new(file_name)) {
            return Some(format);
        }
        if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            Some(TableFormat::Workbook)
        } else {
            None
        }
    }
}

pub fn read_path(path: &Path) -> Result<DataFrame> {
    let format = TableFormat::from_path(path)
        .ok_or_else(|| AmsError::UnsupportedFormat(path.display().to_string()))?;
    debug!("Reading {:?} as {:?}", path, format);

    match format {
        TableFormat::Csv => {
            let df = LazyCsvReader::new(path)
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .finish()?
                .collect()?;
            Ok(df)
        }
        TableFormat::Workbook => {
            let mut workbook = open_workbook_auto(path)
                .map_err(|e| AmsError::Spreadsheet(format!("Failed to open {}: {}", path.display(), e)))?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| AmsError::Spreadsheet(format!("{} has no worksheets", path.display())))?
                .map_err(|e| AmsError::Spreadsheet(format!("Failed to read {}: {}", path.display(), e)))?;
            range_to_frame(&range)
        }
    }
}

pub fn read_bytes(file_name: &str, bytes: &[u8]) -> Result<DataFrame> {
    let format = TableFormat::detect(file_name, bytes)
        .ok_or_else(|| AmsError::UnsupportedFormat(file_name.to_string()))?;
    debug!("Reading upload '{}' ({} bytes) as {:?}", file_name, bytes.len(), format);

    match format {
        TableFormat::Csv => {
            let df = CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
                .finish()?;
            Ok(df)
        }
        TableFormat::Workbook => {
            let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
                .map_err(|e| AmsError::Spreadsheet(format!("Failed to open {}: {}", file_name, e)))?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| AmsError::Spreadsheet(format!("{} has no worksheets", file_name)))?
                .map_err(|e| AmsError::Spreadsheet(format!("Failed to read {}: {}", file_name, e)))?;
            range_to_frame(&range)
        }
    }
}

pub fn cell_from_data(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Int(i) => Some(CellValue::Integer(*i)),
        Data::Float(f) => Some(CellValue::Float(*f)),
        Data::Bool(b) => Some(CellValue::Boolean(*b)),
        Data::DateTime(_) => data.as_datetime().map(CellValue::DateTime),
    }
}

/// Build a frame from a worksheet range. The first row is the header.
pub fn range_to_frame(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(DataFrame::empty());
    };

    let headers = unique_headers(header_row);
    let mut cells: Vec<Vec<Option<CellValue>>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get(idx).and_then(cell_from_data));
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| typed_series(name, values))
        .collect::<Vec<_>>();

    Ok(DataFrame::new(columns)?)
}

/// Header text per column. Blank headers get a positional name and repeated
/// headers get a `.1`, `.2`, ... suffix.
fn unique_headers(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = cell_from_data(cell)
                .map(|c| c.to_string())
                .unwrap_or_else(|| format!("column_{}", idx + 1));
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}

/// Pick the narrowest column type that holds every non-empty cell, falling
/// back to rendered text for mixed columns.
fn typed_series(name: &str, values: Vec<Option<CellValue>>) -> Series {
    let present = || values.iter().flatten();
    let has_values = present().next().is_some();

    let all_numeric = present().all(|v| matches!(v, CellValue::Integer(_) | CellValue::Float(_)));
    let all_integral = present().all(|v| match v {
        CellValue::Integer(_) => true,
        CellValue::Float(f) => f.fract() == 0.0 && f.abs() < 9.0e15,
        _ => false,
    });
    let all_bool = present().all(|v| matches!(v, CellValue::Boolean(_)));
    let all_temporal = present().all(|v| matches!(v, CellValue::Date(_) | CellValue::DateTime(_)));

    if has_values && all_integral {
        let ints: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                Some(CellValue::Integer(i)) => Some(*i),
                Some(CellValue::Float(f)) => Some(*f as i64),
                _ => None,
            })
            .collect();
        return Series::new(name, ints);
    }

    if has_values && all_numeric {
        let floats: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Some(CellValue::Integer(i)) => Some(*i as f64),
                Some(CellValue::Float(f)) => Some(*f),
                _ => None,
            })
            .collect();
        return Series::new(name, floats);
    }

    if has_values && all_bool {
        let bools: Vec<Option<bool>> = values
            .iter()
            .map(|v| match v {
                Some(CellValue::Boolean(b)) => Some(*b),
                _ => None,
            })
            .collect();
        return Series::new(name, bools);
    }

    if has_values && all_temporal {
        let datetimes: Vec<Option<NaiveDateTime>> = values
            .iter()
            .map(|v| match v {
                Some(CellValue::Date(d)) => Some(d.and_time(NaiveTime::MIN)),
                Some(CellValue::DateTime(dt)) => Some(*dt),
                _ => None,
            })
            .collect();
        let date_only = datetimes.iter().flatten().all(|dt| dt.time() == NaiveTime::MIN);
        if date_only {
            let dates: Vec<Option<NaiveDate>> = datetimes.iter().map(|dt| dt.map(|dt| dt.date())).collect();
            return Series::new(name, dates);
        }
        return Series::new(name, datetimes);
    }

    let text: Vec<Option<String>> = values.iter().map(|v| v.as_ref().map(|c| c.to_string())).collect();
    Series::new(name, text)
}
