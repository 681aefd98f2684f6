use crate::ams_writer::OutputFormat;
use crate::error::{AmsError, Result};
use crate::reference::ReloadPolicy;
use crate::resolver::ResolverOptions;
use crate::similarity::Scorer;
use std::path::PathBuf;

pub const DEFAULT_CATALOG_PATH: &str = "UPC CODES.xlsx";
pub const DEFAULT_DIRECTORY_PATH: &str = "Delivery addresses v2.xlsx";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_OUTPUT_NAME: &str = "AMS_Order.xlsx";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Runtime configuration, read from `AMS_*` environment variables (a `.env`
/// file is honoured by the binaries) and optionally overridden from the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterConfig {
    pub catalog_path: PathBuf,
    pub directory_path: PathBuf,
    pub bind_addr: String,
    pub resolver: ResolverOptions,
    pub reload: ReloadPolicy,
    pub max_upload_bytes: usize,
    /// File name offered for download; its extension (`.xlsx` or `.csv`)
    /// selects the AMS file format.
    pub output_name: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            directory_path: PathBuf::from(DEFAULT_DIRECTORY_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            resolver: ResolverOptions::default(),
            reload: ReloadPolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

impl ConverterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(path) = get("AMS_CATALOG_PATH") {
            config.catalog_path = PathBuf::from(path);
        }
        if let Some(path) = get("AMS_DIRECTORY_PATH") {
            config.directory_path = PathBuf::from(path);
        }
        if let Some(addr) = get("AMS_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(score) = get("AMS_MIN_SCORE") {
            config.resolver.min_score = Some(parse_min_score(&score)?);
        }
        if let Some(scorer) = get("AMS_SCORER") {
            config.resolver.scorer = scorer.parse::<Scorer>()?;
        }
        if let Some(policy) = get("AMS_REFERENCE_RELOAD") {
            config.reload = policy.parse()?;
        }
        if let Some(limit) = get("AMS_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = limit
                .parse()
                .map_err(|_| AmsError::Config(format!("AMS_MAX_UPLOAD_BYTES must be a byte count, got '{}'", limit)))?;
        }
        if let Some(name) = get("AMS_OUTPUT_NAME") {
            if OutputFormat::from_name(&name).is_none() {
                return Err(AmsError::Config(format!(
                    "AMS_OUTPUT_NAME must end in .xlsx or .csv, got '{}'",
                    name
                )));
            }
            config.output_name = name;
        }

        Ok(config)
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_name(&self.output_name).unwrap_or_default()
    }
}

/// Parse a minimum similarity score in `0..=100`.
pub fn parse_min_score(raw: &str) -> Result<f64> {
    let score: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AmsError::Config(format!("min score must be a number, got '{}'", raw)))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(AmsError::Config(format!("min score must be between 0 and 100, got {}", score)));
    }
    Ok(score)
}
