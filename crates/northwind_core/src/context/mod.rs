//! Data access context: configuration plus scoped session factory.
//!
//! # Responsibility
//! - Hold the storage location and schema-shaping rules (standing filter,
//!   cost conversion) chosen at construction.
//! - Open single-use sessions that apply those rules.
//!
//! # Invariants
//! - Construction performs no I/O; storage errors surface from `open`.
//! - `with_session` releases the session on every exit path.

mod config;

pub use config::CatalogConfig;

use crate::db::open_db;
use crate::repo::error::{CatalogError, CatalogResult};
use crate::session::{Session, SessionSettings};

/// Factory for catalog sessions.
#[derive(Debug, Clone)]
pub struct CatalogContext {
    config: CatalogConfig,
}

impl CatalogContext {
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Opens a session on the backing file, creating and migrating it if
    /// needed.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the file cannot be opened, created or
    ///   bootstrapped.
    pub fn open(&self) -> CatalogResult<Session> {
        let conn = open_db(&self.config.db_path, self.config.cost_conversion)
            .map_err(CatalogError::StorageUnavailable)?;

        let settings = SessionSettings {
            exclude_discontinued: self.config.exclude_discontinued,
            cost_conversion: self.config.cost_conversion,
            fetch_batch_size: self.config.fetch_batch_size.max(1),
        };
        Ok(Session::new(
            conn,
            settings,
            self.config.default_load_strategy,
        ))
    }

    /// Runs `work` inside a fresh session and closes it afterwards.
    ///
    /// An error from `work` takes precedence over a close error.
    pub fn with_session<T>(
        &self,
        work: impl FnOnce(&Session) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let session = self.open()?;
        let outcome = work(&session);
        let closed = session.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }
}
