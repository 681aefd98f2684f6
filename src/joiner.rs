use crate::model::{EnrichedOrderRow, ProductCatalogEntry, ResolvedOrderRow, StoreDirectoryEntry};
use crate::normalize::normalize_store_name;
use itertools::iproduct;
use std::collections::HashMap;

/// Exact-key left joins of resolved orders against the catalog and directory.
///
/// Both joins are real joins, not lookups: when a reference key repeats, the
/// order row is emitted once per matching reference row. A row with no match
/// (or a null key) is emitted once with that side empty.
///
/// Directory entries are indexed by their normalized store name, the same form
/// the resolver matches against.
pub struct EnrichmentJoiner<'r> {
    catalog: HashMap<String, Vec<&'r ProductCatalogEntry>>,
    directory: HashMap<String, Vec<&'r StoreDirectoryEntry>>,
}

impl<'r> EnrichmentJoiner<'r> {
    pub fn new(catalog: &'r [ProductCatalogEntry], directory: &'r [StoreDirectoryEntry]) -> Self {
        let mut catalog_index: HashMap<String, Vec<&ProductCatalogEntry>> = HashMap::new();
        for entry in catalog {
            catalog_index
                .entry(entry.model_number.as_key())
                .or_default()
                .push(entry);
        }

        let mut directory_index: HashMap<String, Vec<&StoreDirectoryEntry>> = HashMap::new();
        for entry in directory {
            let name = normalize_store_name(&entry.store_name);
            if name.is_empty() {
                continue;
            }
            directory_index.entry(name).or_default().push(entry);
        }

        Self {
            catalog: catalog_index,
            directory: directory_index,
        }
    }

    pub fn products_for(&self, row: &ResolvedOrderRow) -> &[&'r ProductCatalogEntry] {
        row.order
            .model_number
            .as_ref()
            .and_then(|key| self.catalog.get(&key.as_key()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stores_for(&self, row: &ResolvedOrderRow) -> &[&'r StoreDirectoryEntry] {
        row.resolved_store
            .as_deref()
            .and_then(|name| self.directory.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Join one row. Output order is catalog order, then directory order.
    pub fn join_row<'a>(&self, row: &'a ResolvedOrderRow) -> Vec<EnrichedOrderRow<'a>>
    where
        'r: 'a,
    {
        let products = left_side(self.products_for(row));
        let stores = left_side(self.stores_for(row));

        iproduct!(products, stores)
            .map(|(product, store)| EnrichedOrderRow {
                resolved: row,
                product,
                store,
            })
            .collect()
    }

    /// Join every row, preserving input order.
    pub fn join<'a>(&self, rows: &'a [ResolvedOrderRow]) -> Vec<EnrichedOrderRow<'a>>
    where
        'r: 'a,
    {
        rows.iter().flat_map(|row| self.join_row(row)).collect()
    }
}

/// Matches as `Some`, or a single `None` when there are none.
fn left_side<T: Copy>(matches: &[T]) -> Vec<Option<T>> {
    if matches.is_empty() {
        vec![None]
    } else {
        matches.iter().copied().map(Some).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, OrderRow};

    fn product(model: &str, code: &str) -> ProductCatalogEntry {
        ProductCatalogEntry {
            model_number: CellValue::from(model),
            item_code: Some(CellValue::from(code)),
            item_description: None,
        }
    }

    fn store(name: &str, city: &str) -> StoreDirectoryEntry {
        StoreDirectoryEntry {
            store_name: name.to_string(),
            city: Some(CellValue::from(city)),
            ..Default::default()
        }
    }

    fn resolved(model: Option<&str>, store: Option<&str>) -> ResolvedOrderRow {
        ResolvedOrderRow {
            order: OrderRow {
                model_number: model.map(CellValue::from),
                ..Default::default()
            },
            resolved_store: store.map(str::to_string),
            match_score: None,
        }
    }

    #[test]
    fn test_unmatched_rows_survive_once() {
        let catalog = vec![product("M1", "C1")];
        let directory = vec![store("North Store", "Sydney")];
        let joiner = EnrichmentJoiner::new(&catalog, &directory);

        let rows = vec![
            resolved(Some("M9"), Some("Nowhere")),
            resolved(None, None),
            resolved(Some("M1"), Some("North Store")),
        ];
        let joined = joiner.join(&rows);

        assert_eq!(joined.len(), 3);
        assert!(joined[0].product.is_none() && joined[0].store.is_none());
        assert!(joined[1].product.is_none() && joined[1].store.is_none());
        assert_eq!(joined[2].product.unwrap().item_code, Some(CellValue::from("C1")));
        assert_eq!(joined[2].store.unwrap().city, Some(CellValue::from("Sydney")));
    }

    #[test]
    fn test_duplicate_model_numbers_fan_out() {
        let catalog = vec![product("M1", "C1"), product("M2", "C2"), product("M1", "C1b")];
        let directory: Vec<StoreDirectoryEntry> = vec![];
        let joiner = EnrichmentJoiner::new(&catalog, &directory);

        let rows = vec![resolved(Some("M1"), None)];
        let joined = joiner.join(&rows);

        let codes: Vec<_> = joined
            .iter()
            .map(|r| r.product.unwrap().item_code.clone().unwrap().to_string())
            .collect();
        assert_eq!(codes, vec!["C1", "C1b"]);
    }

    #[test]
    fn test_fan_out_multiplies_across_both_tables() {
        let catalog = vec![product("M1", "C1"), product("M1", "C2")];
        let directory = vec![store("North Store", "Sydney"), store("North Store", "Perth")];
        let joiner = EnrichmentJoiner::new(&catalog, &directory);

        let rows = vec![resolved(Some("M1"), Some("North Store"))];
        assert_eq!(joiner.join(&rows).len(), 4);
    }

    #[test]
    fn test_directory_names_are_matched_in_normalized_form() {
        let catalog: Vec<ProductCatalogEntry> = vec![];
        let directory = vec![store("  north   STORE ", "Sydney")];
        let joiner = EnrichmentJoiner::new(&catalog, &directory);

        let rows = vec![resolved(None, Some("North Store"))];
        let joined = joiner.join(&rows);
        assert_eq!(joined[0].store.unwrap().city, Some(CellValue::from("Sydney")));
    }

    #[test]
    fn test_model_number_match_is_case_sensitive() {
        let catalog = vec![product("m1", "C1")];
        let directory: Vec<StoreDirectoryEntry> = vec![];
        let joiner = EnrichmentJoiner::new(&catalog, &directory);

        let rows = vec![resolved(Some("M1"), None)];
        let joined = joiner.join(&rows);
        assert_eq!(joined.len(), 1);
        assert!(joined[0].product.is_none());
    }

    #[test]
    fn test_numeric_and_text_keys_join_on_rendered_value() {
        let catalog = vec![ProductCatalogEntry {
            model_number: CellValue::Float(12345.0),
            item_code: Some(CellValue::from("C9")),
            item_description: None,
        }];
        let directory: Vec<StoreDirectoryEntry> = vec![];
        let joiner = EnrichmentJoiner::new(&catalog, &directory);

        let rows = vec![resolved(Some("12345"), None)];
        assert!(joiner.join(&rows)[0].product.is_some());
    }
}
