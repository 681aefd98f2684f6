//! Lifting `DataFrame`s into typed pipeline records.
//!
//! This is where structural validation happens: a required column missing from
//! a table aborts the conversion with [`AmsError::MissingColumn`] before any
//! pipeline stage runs. Extra columns are ignored.

use crate::error::{AmsError, Result};
use crate::model::{CellValue, OrderRow, ProductCatalogEntry, StoreDirectoryEntry};
use crate::normalize::normalize_store_name;
use chrono::{DateTime, NaiveDate};
use polars::prelude::*;

pub const ORDER_TABLE: &str = "order extract";
pub const CATALOG_TABLE: &str = "product catalog";
pub const DIRECTORY_TABLE: &str = "store directory";

pub const LOCATION: &str = "Location";
pub const MODEL_NUMBER: &str = "Model Number";
pub const QUANTITY: &str = "Quantity";
pub const DOCUMENT_NUMBER: &str = "Document Number";
pub const DATE: &str = "Date";
pub const PHONE: &str = "Phone";

pub const ORDER_COLUMNS: [&str; 6] = [LOCATION, MODEL_NUMBER, QUANTITY, DOCUMENT_NUMBER, DATE, PHONE];

pub const ITEM_CODE: &str = "Item_Code";
pub const ITEM_DESCRIPTION: &str = "Item Description";

pub const CATALOG_COLUMNS: [&str; 3] = [MODEL_NUMBER, ITEM_CODE, ITEM_DESCRIPTION];

/// Accepted headers for the directory's store-name column, in preference order.
pub const STORE_NAME_COLUMNS: [&str; 2] = ["Store", "Mapped Store"];

pub const DIRECTORY_COLUMNS: [&str; 9] = [
    "Ship_Addressee",
    "Ship_Address Line 1",
    "Ship_Address Line 2",
    "Ship_City",
    "Ship_State",
    "Ship_Postcode",
    "Ship_Country",
    "Ship_Delivery Instructions",
    "Despatch_Method",
];

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert one polars value into a cell. Nulls and blank text become `None`.
pub fn cell_from_any(value: AnyValue<'_>) -> Option<CellValue> {
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(CellValue::Boolean(b)),
        AnyValue::String(s) => CellValue::text(s),
        AnyValue::StringOwned(s) => CellValue::text(s.as_str()),
        AnyValue::Int8(v) => Some(CellValue::Integer(v as i64)),
        AnyValue::Int16(v) => Some(CellValue::Integer(v as i64)),
        AnyValue::Int32(v) => Some(CellValue::Integer(v as i64)),
        AnyValue::Int64(v) => Some(CellValue::Integer(v)),
        AnyValue::UInt8(v) => Some(CellValue::Integer(v as i64)),
        AnyValue::UInt16(v) => Some(CellValue::Integer(v as i64)),
        AnyValue::UInt32(v) => Some(CellValue::Integer(v as i64)),
        AnyValue::UInt64(v) => Some(CellValue::Text(v.to_string())),
        AnyValue::Float32(v) if v.is_nan() => None,
        AnyValue::Float32(v) => Some(CellValue::Float(v as f64)),
        AnyValue::Float64(v) if v.is_nan() => None,
        AnyValue::Float64(v) => Some(CellValue::Float(v)),
        AnyValue::Date(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE).map(CellValue::Date),
        AnyValue::Datetime(v, unit, _) => {
            let dt = match unit {
                TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(v)),
                TimeUnit::Microseconds => DateTime::from_timestamp_micros(v),
                TimeUnit::Milliseconds => DateTime::from_timestamp_millis(v),
            };
            dt.map(|dt| CellValue::DateTime(dt.naive_utc()))
        }
        other => CellValue::text(other.to_string()),
    }
}

/// Find a column by header, tolerating stray whitespace around the header.
pub fn find_column<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Series> {
    df.get_columns().iter().find(|s| s.name().trim() == name)
}

fn require_column<'a>(df: &'a DataFrame, table: &str, name: &str) -> Result<&'a Series> {
    find_column(df, name).ok_or_else(|| AmsError::missing_column(table, name))
}

fn cell(series: &Series, idx: usize) -> Result<Option<CellValue>> {
    Ok(cell_from_any(series.get(idx)?))
}

/// Check that every required column is present.
pub fn validate_columns(df: &DataFrame, table: &str, required: &[&str]) -> Result<()> {
    for name in required {
        require_column(df, table, name)?;
    }
    Ok(())
}

pub fn order_rows(df: &DataFrame) -> Result<Vec<OrderRow>> {
    validate_columns(df, ORDER_TABLE, &ORDER_COLUMNS)?;

    let location = require_column(df, ORDER_TABLE, LOCATION)?;
    let model = require_column(df, ORDER_TABLE, MODEL_NUMBER)?;
    let quantity = require_column(df, ORDER_TABLE, QUANTITY)?;
    let document = require_column(df, ORDER_TABLE, DOCUMENT_NUMBER)?;
    let date = require_column(df, ORDER_TABLE, DATE)?;
    let phone = require_column(df, ORDER_TABLE, PHONE)?;

    (0..df.height())
        .map(|idx| {
            Ok(OrderRow {
                location: cell(location, idx)?.map(|c| c.to_string()),
                model_number: cell(model, idx)?,
                quantity: cell(quantity, idx)?,
                document_number: cell(document, idx)?,
                order_date: cell(date, idx)?,
                phone: cell(phone, idx)?,
            })
        })
        .collect()
}

/// Catalog columns are taken by name; a headerless three-column sheet is
/// read positionally as model number, item code, item description.
pub fn catalog_entries(df: &DataFrame) -> Result<Vec<ProductCatalogEntry>> {
    let by_name: Option<Vec<&Series>> = CATALOG_COLUMNS.iter().map(|c| find_column(df, c)).collect();
    let columns = match by_name {
        Some(cols) => cols,
        None if df.width() == 3 => df.get_columns().iter().collect(),
        None => {
            let missing = CATALOG_COLUMNS
                .iter()
                .find(|c| find_column(df, c).is_none())
                .copied()
                .unwrap_or(MODEL_NUMBER);
            return Err(AmsError::missing_column(CATALOG_TABLE, missing));
        }
    };

    let mut entries = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        // Rows without a model number can never be joined.
        let Some(model_number) = cell(columns[0], idx)? else {
            continue;
        };
        entries.push(ProductCatalogEntry {
            model_number,
            item_code: cell(columns[1], idx)?,
            item_description: cell(columns[2], idx)?,
        });
    }
    Ok(entries)
}

pub fn directory_entries(df: &DataFrame) -> Result<Vec<StoreDirectoryEntry>> {
    let store = STORE_NAME_COLUMNS
        .iter()
        .find_map(|c| find_column(df, c))
        .ok_or_else(|| AmsError::missing_column(DIRECTORY_TABLE, STORE_NAME_COLUMNS[0]))?;

    let cols = DIRECTORY_COLUMNS
        .iter()
        .map(|c| require_column(df, DIRECTORY_TABLE, c))
        .collect::<Result<Vec<_>>>()?;

    let mut entries = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let Some(raw_name) = cell(store, idx)? else {
            continue;
        };
        entries.push(StoreDirectoryEntry {
            store_name: normalize_store_name(&raw_name.to_string()),
            addressee: cell(cols[0], idx)?,
            address_line_1: cell(cols[1], idx)?,
            address_line_2: cell(cols[2], idx)?,
            city: cell(cols[3], idx)?,
            state: cell(cols[4], idx)?,
            postcode: cell(cols[5], idx)?,
            country: cell(cols[6], idx)?,
            delivery_instructions: cell(cols[7], idx)?,
            despatch_method: cell(cols[8], idx)?,
        });
    }
    Ok(entries)
}
