use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmsError {
    /// A required column is absent from one of the input tables.
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl AmsError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        AmsError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// Structural errors abort a conversion because the input shape is wrong,
    /// as opposed to the file being unreadable.
    pub fn is_structural(&self) -> bool {
        matches!(self, AmsError::MissingColumn { .. })
    }
}

pub type Result<T> = std::result::Result<T, AmsError>;
