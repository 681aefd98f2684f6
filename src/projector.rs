use crate::model::{EnrichedOrderRow, OutputRow};

/// AMS file columns, in contract order.
pub const OUTPUT_COLUMNS: [&str; 15] = [
    "Phone",
    "Sales Order Number",
    "Date of Order",
    "Item_Code",
    "Item Description",
    "Quantity",
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

/// Maps enriched rows onto the AMS output contract.
///
/// Document number becomes "Sales Order Number" and order date becomes
/// "Date of Order"; everything else is a straight rename. Missing catalog or
/// directory matches project as empty fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaProjector;

impl SchemaProjector {
    pub fn columns(&self) -> &'static [&'static str] {
        &OUTPUT_COLUMNS
    }

    pub fn project(&self, row: &EnrichedOrderRow<'_>) -> OutputRow {
        let order = &row.resolved.order;
        let product = row.product;
        let store = row.store;

        OutputRow {
            phone: order.phone.clone(),
            sales_order_number: order.document_number.clone(),
            date_of_order: order.order_date.clone(),
            item_code: product.and_then(|p| p.item_code.clone()),
            item_description: product.and_then(|p| p.item_description.clone()),
            quantity: order.quantity.clone(),
            ship_addressee: store.and_then(|s| s.addressee.clone()),
            ship_address_line_1: store.and_then(|s| s.address_line_1.clone()),
            ship_address_line_2: store.and_then(|s| s.address_line_2.clone()),
            ship_city: store.and_then(|s| s.city.clone()),
            ship_state: store.and_then(|s| s.state.clone()),
            ship_postcode: store.and_then(|s| s.postcode.clone()),
            ship_country: store.and_then(|s| s.country.clone()),
            ship_delivery_instructions: store.and_then(|s| s.delivery_instructions.clone()),
            despatch_method: store.and_then(|s| s.despatch_method.clone()),
        }
    }

    pub fn project_all(&self, rows: &[EnrichedOrderRow<'_>]) -> Vec<OutputRow> {
        rows.iter().map(|row| self.project(row)).collect()
    }
}
