//! Relationship loading state for entities read through a session.
//!
//! # Invariants
//! - A loaded relationship never re-queries storage.
//! - A lazy relationship only holds a weak session link; it never keeps the
//!   connection alive and fails with `SessionClosed` once the session is gone.
//! - An explicit relationship that was never loaded reports
//!   `RelationNotLoaded` instead of an empty value.

use crate::repo::error::{CatalogError, CatalogResult};
use crate::session::SessionState;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};

/// When a relationship is fetched relative to the query that loads its owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Fetched as part of the owning query, one batch per result page.
    Eager,
    /// Fetched on first access while the session is still open.
    Lazy,
    /// Fetched only through `Session::load_*` calls.
    #[default]
    Explicit,
}

pub(crate) type RelationFetch<T> = fn(&Rc<SessionState>, i64) -> CatalogResult<T>;

#[derive(Clone)]
struct LazyLoader<T> {
    session: Weak<SessionState>,
    key: i64,
    fetch: RelationFetch<T>,
}

impl<T> LazyLoader<T> {
    fn is_live(&self) -> bool {
        self.session
            .upgrade()
            .is_some_and(|session| session.is_open())
    }
}

/// Relationship slot on an entity.
#[derive(Clone)]
pub struct Related<T> {
    name: &'static str,
    value: OnceCell<T>,
    loader: Option<LazyLoader<T>>,
}

impl<T> Related<T> {
    pub(crate) fn not_loaded(name: &'static str) -> Self {
        Self {
            name,
            value: OnceCell::new(),
            loader: None,
        }
    }

    pub(crate) fn loaded(name: &'static str, value: T) -> Self {
        Self {
            name,
            value: OnceCell::from(value),
            loader: None,
        }
    }

    pub(crate) fn lazy(
        name: &'static str,
        session: &Rc<SessionState>,
        key: i64,
        fetch: RelationFetch<T>,
    ) -> Self {
        Self {
            name,
            value: OnceCell::new(),
            loader: Some(LazyLoader {
                session: Rc::downgrade(session),
                key,
                fetch,
            }),
        }
    }

    /// Returns the related value, fetching it first for lazy relationships.
    ///
    /// A lazily fetched value is only served while its session is open.
    pub fn get(&self) -> CatalogResult<&T> {
        let Some(loader) = &self.loader else {
            return self
                .value
                .get()
                .ok_or(CatalogError::RelationNotLoaded(self.name));
        };

        let session = loader
            .session
            .upgrade()
            .filter(|session| session.is_open())
            .ok_or(CatalogError::SessionClosed)?;
        self.value
            .get_or_try_init(|| (loader.fetch)(&session, loader.key))
    }

    /// Returns the value only if it is in memory and still valid.
    pub fn loaded_value(&self) -> Option<&T> {
        match &self.loader {
            Some(loader) if !loader.is_live() => None,
            _ => self.value.get(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_value().is_some()
    }

    pub(crate) fn set(&mut self, value: T) {
        self.value = OnceCell::from(value);
        self.loader = None;
    }
}

impl<T: Debug> Debug for Related<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.loaded_value(), &self.loader) {
            (Some(value), _) => value.fmt(f),
            (None, Some(_)) => write!(f, "<lazy {}>", self.name),
            (None, None) => write!(f, "<not loaded {}>", self.name),
        }
    }
}

/// Serializes `loaded_value()`; never touches storage.
impl<T: Serialize> Serialize for Related<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.loaded_value().serialize(serializer)
    }
}
