//! Error taxonomy shared by sessions, queries and mutations.

use crate::db::DbError;
use crate::model::validation::ModelValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog data-access error.
///
/// Callers decide how each kind is presented; core never prints.
#[derive(Debug)]
pub enum CatalogError {
    /// Backing file cannot be created, opened or bootstrapped.
    StorageUnavailable(DbError),
    /// Write rejected by declaration-level constraints.
    Validation(ModelValidationError),
    /// Update or lookup target is absent.
    NotFound(String),
    /// Session was closed before a deferred fetch ran.
    SessionClosed,
    /// Explicit relationship accessed before `Session::load_*`.
    RelationNotLoaded(&'static str),
    /// Read failed in the storage engine.
    Query(DbError),
    /// Write or commit failed in the storage engine.
    Storage(DbError),
    /// Affected-row count differs from what the operation requires.
    Inconsistency { expected: usize, actual: usize },
    /// Stored row cannot be decoded into the model.
    InvalidData(String),
}

impl CatalogError {
    pub(crate) fn storage(err: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(err))
    }

    /// Stable machine-readable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::SessionClosed => "session_closed",
            Self::RelationNotLoaded(_) => "relation_not_loaded",
            Self::Query(_) => "query_failed",
            Self::Storage(_) => "storage_failed",
            Self::Inconsistency { .. } => "inconsistency",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "catalog storage unavailable: {err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::SessionClosed => write!(f, "session is closed"),
            Self::RelationNotLoaded(name) => write!(f, "relationship `{name}` is not loaded"),
            Self::Query(err) => write!(f, "query failed: {err}"),
            Self::Storage(err) => write!(f, "storage write failed: {err}"),
            Self::Inconsistency { expected, actual } => write!(
                f,
                "expected {expected} affected row(s), storage reported {actual}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound(_)
            | Self::SessionClosed
            | Self::RelationNotLoaded(_)
            | Self::Inconsistency { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for CatalogError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Read-path default; write paths map through `CatalogError::storage`.
impl From<rusqlite::Error> for CatalogError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Query(DbError::Sqlite(value))
    }
}
