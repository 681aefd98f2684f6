//! The conversion pipeline: Resolve -> Join(catalog) -> Join(directory) -> Project.
//!
//! Every stage is a pure transform over the full row set. Reference tables are
//! borrowed immutably, so a failed request leaves nothing behind.

use crate::error::Result;
use crate::joiner::EnrichmentJoiner;
use crate::model::{OrderRow, OutputRow, ProductCatalogEntry, StoreDirectoryEntry};
use crate::projector::SchemaProjector;
use crate::reference::ReferenceData;
use crate::resolver::{Resolution, ResolverOptions, StoreResolver};
use crate::table;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};

/// Why a location produced no store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    MissingLocation,
    EmptyDirectory,
    BelowMinScore { best: String, score: f64 },
}

/// Non-fatal data-quality findings. `row` is the 0-based index of the order row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    UnresolvedStore {
        row: usize,
        location: Option<String>,
        reason: UnresolvedReason,
    },
    UnmatchedModel {
        row: usize,
        model_number: Option<String>,
    },
    UnmatchedStore {
        row: usize,
        store: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionReport {
    pub order_rows: usize,
    pub output_rows: usize,
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionReport {
    pub fn unresolved_stores(&self) -> usize {
        self.count(|w| matches!(w, ConversionWarning::UnresolvedStore { .. }))
    }

    pub fn unmatched_models(&self) -> usize {
        self.count(|w| matches!(w, ConversionWarning::UnmatchedModel { .. }))
    }

    pub fn unmatched_stores(&self) -> usize {
        self.count(|w| matches!(w, ConversionWarning::UnmatchedStore { .. }))
    }

    fn count(&self, pred: impl Fn(&ConversionWarning) -> bool) -> usize {
        self.warnings.iter().filter(|w| pred(w)).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} order rows -> {} output rows ({} unresolved stores, {} unmatched models, {} unmatched stores)",
            self.order_rows,
            self.output_rows,
            self.unresolved_stores(),
            self.unmatched_models(),
            self.unmatched_stores()
        )
    }
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub rows: Vec<OutputRow>,
    pub report: ConversionReport,
}

/// Convert order rows into AMS output rows.
pub fn convert(
    orders: Vec<OrderRow>,
    catalog: &[ProductCatalogEntry],
    directory: &[StoreDirectoryEntry],
    options: ResolverOptions,
) -> Conversion {
    let order_rows = orders.len();
    let mut warnings = Vec::new();

    let resolver = StoreResolver::from_directory(directory, options);
    let (resolved, resolutions): (Vec<_>, Vec<_>) = resolver.resolve_rows(orders).into_iter().unzip();

    for (row, (resolution, resolved_row)) in resolutions.into_iter().zip(&resolved).enumerate() {
        let reason = match resolution {
            Resolution::Matched { .. } => continue,
            Resolution::NoLocation => UnresolvedReason::MissingLocation,
            Resolution::NoCandidates => UnresolvedReason::EmptyDirectory,
            Resolution::BelowThreshold { best, score } => UnresolvedReason::BelowMinScore { best, score },
        };
        warnings.push(ConversionWarning::UnresolvedStore {
            row,
            location: resolved_row.order.location.clone(),
            reason,
        });
    }

    let joiner = EnrichmentJoiner::new(catalog, directory);
    for (row, resolved_row) in resolved.iter().enumerate() {
        if joiner.products_for(resolved_row).is_empty() {
            warnings.push(ConversionWarning::UnmatchedModel {
                row,
                model_number: resolved_row.order.model_number.as_ref().map(|m| m.to_string()),
            });
        }
        if let Some(store) = &resolved_row.resolved_store {
            if joiner.stores_for(resolved_row).is_empty() {
                warnings.push(ConversionWarning::UnmatchedStore {
                    row,
                    store: store.clone(),
                });
            }
        }
    }

    let enriched = joiner.join(&resolved);
    let rows = SchemaProjector.project_all(&enriched);

    let report = ConversionReport {
        order_rows,
        output_rows: rows.len(),
        warnings,
    };

    if report.warnings.is_empty() {
        info!("Conversion complete: {}", report.summary());
    } else {
        warn!("Conversion complete with warnings: {}", report.summary());
    }

    Conversion { rows, report }
}

/// Lift an order extract into typed rows and convert it. Fails only when the
/// extract is missing a required column.
pub fn convert_table(orders: &DataFrame, reference: &ReferenceData, options: ResolverOptions) -> Result<Conversion> {
    let rows = table::order_rows(orders)?;
    Ok(convert(rows, &reference.catalog, &reference.directory, options))
}
