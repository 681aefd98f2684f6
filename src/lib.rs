//! AMS order conversion: resolve retailer store names against a delivery
//! directory, enrich each order line from a product catalog and the directory,
//! and project the result onto the fixed AMS import layout.

pub mod ams_writer;
pub mod config;
pub mod error;
pub mod joiner;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod projector;
pub mod reference;
pub mod resolver;
pub mod server;
pub mod similarity;
pub mod spreadsheet;
pub mod table;

pub use ams_writer::OutputFormat;
pub use config::ConverterConfig;
pub use error::{AmsError, Result};
pub use model::{CellValue, OrderRow, OutputRow, ProductCatalogEntry, StoreDirectoryEntry};
pub use pipeline::{convert, convert_table, Conversion, ConversionReport, ConversionWarning};
pub use projector::OUTPUT_COLUMNS;
pub use reference::{FileReferenceSource, ReferenceData, ReferenceProvider, ReferenceSource, ReloadPolicy};
pub use resolver::{Resolution, ResolverOptions, StoreResolver};
pub use similarity::Scorer;
