//! Explicit configuration for a catalog context.

use crate::db::{DbError, CATALOG_DB_FILE_NAME};
use crate::model::money::CostConversion;
use crate::repo::error::{CatalogError, CatalogResult};
use crate::session::relation::LoadStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_FETCH_BATCH_SIZE: u32 = 64;

/// Settings fixed at context construction and applied to every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite file backing the catalog.
    pub db_path: PathBuf,
    /// Standing filter: hide discontinued products from product queries.
    #[serde(default = "default_exclude_discontinued")]
    pub exclude_discontinued: bool,
    /// Storage representation of `Products.UnitPrice`.
    #[serde(default)]
    pub cost_conversion: CostConversion,
    /// Initial load strategy of new sessions.
    #[serde(default)]
    pub default_load_strategy: LoadStrategy,
    /// Rows fetched per cursor page. `0` is treated as `1`.
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: u32,
}

impl CatalogConfig {
    /// Default configuration for a database at `db_path`.
    pub fn at_path(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            exclude_discontinued: default_exclude_discontinued(),
            cost_conversion: CostConversion::default(),
            default_load_strategy: LoadStrategy::default(),
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
        }
    }

    /// `Northwind.db` in the process working directory, resolved once now.
    pub fn in_working_dir() -> CatalogResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|err| CatalogError::StorageUnavailable(DbError::Io(err)))?;
        Ok(Self::at_path(cwd.join(CATALOG_DB_FILE_NAME)))
    }

    pub fn with_cost_conversion(mut self, conversion: CostConversion) -> Self {
        self.cost_conversion = conversion;
        self
    }

    pub fn with_load_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.default_load_strategy = strategy;
        self
    }

    pub fn with_fetch_batch_size(mut self, size: u32) -> Self {
        self.fetch_batch_size = size;
        self
    }

    /// Disables the standing discontinued filter for all sessions.
    pub fn include_discontinued(mut self) -> Self {
        self.exclude_discontinued = false;
        self
    }
}

fn default_exclude_discontinued() -> bool {
    true
}

fn default_fetch_batch_size() -> u32 {
    DEFAULT_FETCH_BATCH_SIZE
}

#[cfg(test)]
mod tests {
    use super::CatalogConfig;
    use crate::model::money::CostConversion;
    use crate::session::relation::LoadStrategy;

    #[test]
    fn defaults_hide_discontinued_and_store_cents() {
        let config = CatalogConfig::at_path("/tmp/catalog.db");
        assert!(config.exclude_discontinued);
        assert_eq!(config.cost_conversion, CostConversion::Cents);
        assert_eq!(config.default_load_strategy, LoadStrategy::Explicit);
        assert_eq!(config.fetch_batch_size, 64);
    }

    #[test]
    fn working_dir_config_uses_fixed_file_name() {
        let config = CatalogConfig::in_working_dir().unwrap();
        assert!(config.db_path.is_absolute());
        assert!(config.db_path.ends_with("Northwind.db"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{"db_path":"/data/nw.db","cost_conversion":"real"}"#)
                .unwrap();
        assert_eq!(config.cost_conversion, CostConversion::Real);
        assert!(config.exclude_discontinued);
        assert_eq!(config.fetch_batch_size, 64);
    }
}
