//! Reference data: the product catalog and the store directory.
//!
//! The pipeline never loads reference data itself. A [`ReferenceSource`]
//! supplies an immutable [`ReferenceData`] snapshot, and the caller decides how
//! often to ask for a fresh one.

use crate::error::{AmsError, Result};
use crate::model::{ProductCatalogEntry, StoreDirectoryEntry};
use crate::spreadsheet;
use crate::table;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub catalog: Vec<ProductCatalogEntry>,
    pub directory: Vec<StoreDirectoryEntry>,
}

pub trait ReferenceSource: Send + Sync {
    fn load(&self) -> Result<ReferenceData>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Reference tables read from a catalog file and a directory file.
#[derive(Debug, Clone)]
pub struct FileReferenceSource {
    pub catalog_path: PathBuf,
    pub directory_path: PathBuf,
}

impl FileReferenceSource {
    pub fn new(catalog_path: impl Into<PathBuf>, directory_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            directory_path: directory_path.into(),
        }
    }
}

impl ReferenceSource for FileReferenceSource {
    fn load(&self) -> Result<ReferenceData> {
        let catalog_df = spreadsheet::read_path(&self.catalog_path)?;
        let directory_df = spreadsheet::read_path(&self.directory_path)?;

        let data = ReferenceData {
            catalog: table::catalog_entries(&catalog_df)?,
            directory: table::directory_entries(&directory_df)?,
        };
        info!(
            "Loaded {} catalog entries and {} directory entries from {}",
            data.catalog.len(),
            data.directory.len(),
            self.describe()
        );
        Ok(data)
    }

    fn describe(&self) -> String {
        format!("{} + {}", self.catalog_path.display(), self.directory_path.display())
    }
}

/// Fixed in-memory reference data.
#[derive(Debug, Clone, Default)]
pub struct StaticReferenceSource {
    data: ReferenceData,
}

impl StaticReferenceSource {
    pub fn new(data: ReferenceData) -> Self {
        Self { data }
    }
}

impl ReferenceSource for StaticReferenceSource {
    fn load(&self) -> Result<ReferenceData> {
        Ok(self.data.clone())
    }

    fn describe(&self) -> String {
        "in-memory reference data".to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadPolicy {
    /// Load once and reuse the snapshot for every request.
    Startup,
    /// Reload before every conversion so edits to the reference files are
    /// picked up without a restart.
    #[default]
    PerRequest,
}

impl FromStr for ReloadPolicy {
    type Err = AmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "startup" | "once" => Ok(ReloadPolicy::Startup),
            "per-request" | "per_request" | "request" => Ok(ReloadPolicy::PerRequest),
            other => Err(AmsError::Config(format!("unknown reload policy '{}'", other))),
        }
    }
}

/// Hands out reference snapshots according to a [`ReloadPolicy`].
pub struct ReferenceProvider {
    source: Arc<dyn ReferenceSource>,
    policy: ReloadPolicy,
    cached: RwLock<Option<Arc<ReferenceData>>>,
}

impl ReferenceProvider {
    pub fn new(source: Arc<dyn ReferenceSource>, policy: ReloadPolicy) -> Self {
        Self {
            source,
            policy,
            cached: RwLock::new(None),
        }
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    pub fn snapshot(&self) -> Result<Arc<ReferenceData>> {
        if self.policy == ReloadPolicy::PerRequest {
            return Ok(Arc::new(self.source.load()?));
        }

        // A panic while holding the lock cannot leave the slot half-written,
        // so a poisoned lock still holds a usable snapshot.
        let cached = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(data) = cached {
            return Ok(data);
        }

        let data = Arc::new(self.source.load()?);
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(data.clone());
        Ok(data)
    }
}
