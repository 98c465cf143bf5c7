//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the catalog.
//! - Apply schema migrations in deterministic order.
//! - Pin the cost storage representation of a database file.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - A database file is only ever read with the cost conversion it was
//!   created with.

use crate::model::money::CostConversion;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) mod cost;
pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, CATALOG_DB_FILE_NAME};

pub type DbResult<T> = Result<T, DbError>;

/// Low-level storage failure, wrapped by `CatalogError` at the API boundary.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Filesystem failure while locating the catalog file.
    Io(std::io::Error),
    /// The file was written by a newer schema than this binary knows.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The file pins a different cost representation than the context.
    CostConversionMismatch {
        stored: String,
        configured: CostConversion,
    },
}

impl DbError {
    /// SQLite extended result code, when the failure came from SQLite.
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        match self {
            Self::Sqlite(err) => err.sqlite_error_code(),
            _ => None,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Io(err) => write!(f, "catalog file: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "catalog schema version {db_version} is newer than this build supports ({latest_supported})"
            ),
            Self::CostConversionMismatch { stored, configured } => write!(
                f,
                "database stores cost as `{stored}` but context is configured for `{configured}`"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::CostConversionMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
