//! Typed records for each pipeline stage.
//!
//! Rows move through the pipeline as `OrderRow` -> `ResolvedOrderRow` ->
//! `EnrichedOrderRow` -> `OutputRow`. Every optional field is an explicit
//! `Option`, so a failed match is visible in the type rather than hidden in a
//! loosely shaped table.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// A single spreadsheet cell after reading.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Text cells are trimmed; blank text is treated as a missing cell.
    pub fn text(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == value.len() {
            Some(CellValue::Text(value))
        } else {
            Some(CellValue::Text(trimmed.to_string()))
        }
    }

    /// Exact join key: the rendered value, compared case-sensitively.
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{}", v)
                }
            }
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

/// One purchase-order line from the retailer's extract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderRow {
    pub location: Option<String>,
    pub model_number: Option<CellValue>,
    pub quantity: Option<CellValue>,
    pub document_number: Option<CellValue>,
    pub order_date: Option<CellValue>,
    pub phone: Option<CellValue>,
}

/// Canonical ship-to record keyed by store name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDirectoryEntry {
    /// Normalized with [`crate::normalize::normalize_store_name`].
    pub store_name: String,
    pub addressee: Option<CellValue>,
    pub address_line_1: Option<CellValue>,
    pub address_line_2: Option<CellValue>,
    pub city: Option<CellValue>,
    pub state: Option<CellValue>,
    pub postcode: Option<CellValue>,
    pub country: Option<CellValue>,
    pub delivery_instructions: Option<CellValue>,
    pub despatch_method: Option<CellValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductCatalogEntry {
    pub model_number: CellValue,
    pub item_code: Option<CellValue>,
    pub item_description: Option<CellValue>,
}

/// An order row with the canonical store it was matched to, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOrderRow {
    pub order: OrderRow,
    pub resolved_store: Option<String>,
    /// Similarity of the winning candidate, 0-100.
    pub match_score: Option<f64>,
}

/// One join combination. A row that matched nothing on either side still
/// appears once with both references empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedOrderRow<'a> {
    pub resolved: &'a ResolvedOrderRow,
    pub product: Option<&'a ProductCatalogEntry>,
    pub store: Option<&'a StoreDirectoryEntry>,
}

/// A line of the AMS file. Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputRow {
    #[serde(rename = "Phone")]
    pub phone: Option<CellValue>,
    #[serde(rename = "Sales Order Number")]
    pub sales_order_number: Option<CellValue>,
    #[serde(rename = "Date of Order")]
    pub date_of_order: Option<CellValue>,
    #[serde(rename = "Item_Code")]
    pub item_code: Option<CellValue>,
    #[serde(rename = "Item Description")]
    pub item_description: Option<CellValue>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<CellValue>,
    #[serde(rename = "Ship_Addressee")]
    pub ship_addressee: Option<CellValue>,
    #[serde(rename = "Ship_Address Line 1")]
    pub ship_address_line_1: Option<CellValue>,
    #[serde(rename = "Ship_Address Line 2")]
    pub ship_address_line_2: Option<CellValue>,
    #[serde(rename = "Ship_City")]
    pub ship_city: Option<CellValue>,
    #[serde(rename = "Ship_State")]
    pub ship_state: Option<CellValue>,
    #[serde(rename = "Ship_Postcode")]
    pub ship_postcode: Option<CellValue>,
    #[serde(rename = "Ship_Country")]
    pub ship_country: Option<CellValue>,
    #[serde(rename = "Ship_Delivery Instructions")]
    pub ship_delivery_instructions: Option<CellValue>,
    #[serde(rename = "Despatch_Method")]
    pub despatch_method: Option<CellValue>,
}

impl OutputRow {
    /// Cells in output column order.
    pub fn cells(&self) -> [Option<&CellValue>; 15] {
        [
            self.phone.as_ref(),
            self.sales_order_number.as_ref(),
            self.date_of_order.as_ref(),
            self.item_code.as_ref(),
            self.item_description.as_ref(),
            self.quantity.as_ref(),
            self.ship_addressee.as_ref(),
            self.ship_address_line_1.as_ref(),
            self.ship_address_line_2.as_ref(),
            self.ship_city.as_ref(),
            self.ship_state.as_ref(),
            self.ship_postcode.as_ref(),
            self.ship_country.as_ref(),
            self.ship_delivery_instructions.as_ref(),
            self.despatch_method.as_ref(),
        ]
    }
}
