//! Scoped storage sessions.
//!
//! # Responsibility
//! - Own one SQLite connection for the lifetime of a unit of work.
//! - Carry the context configuration every query of the session applies.
//! - Provide explicit relationship loading.
//!
//! # Invariants
//! - The connection is released exactly once, by `close` or on drop.
//! - Entities and cursors only hold weak links; they never extend the
//!   connection lifetime.
//! - Sessions are single-threaded (`!Send`).

pub mod cursor;
pub mod relation;

use crate::model::category::Category;
use crate::model::money::CostConversion;
use crate::model::product::Product;
use crate::repo::category_repo::{
    fetch_category_by_id, fetch_products_for_category, SqliteCategoryRepository,
};
use crate::repo::error::{CatalogError, CatalogResult};
use crate::repo::product_repo::SqliteProductRepository;
use crate::session::relation::LoadStrategy;
use log::{debug, error};
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-session view of the context configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionSettings {
    pub(crate) exclude_discontinued: bool,
    pub(crate) cost_conversion: CostConversion,
    pub(crate) fetch_batch_size: u32,
}

#[derive(Debug)]
pub(crate) struct SessionState {
    id: u64,
    conn: RefCell<Option<Connection>>,
    settings: SessionSettings,
    load_strategy: Cell<LoadStrategy>,
}

impl SessionState {
    pub(crate) fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub(crate) fn load_strategy(&self) -> LoadStrategy {
        self.load_strategy.get()
    }

    /// Runs `f` against the open connection, or fails with `SessionClosed`.
    pub(crate) fn with_conn<R>(
        &self,
        f: impl FnOnce(&Connection) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or(CatalogError::SessionClosed)?;
        f(conn)
    }

    /// Mutable variant of `with_conn` for write transactions.
    pub(crate) fn with_conn_mut<R>(
        &self,
        f: impl FnOnce(&mut Connection) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let mut guard = self.conn.borrow_mut();
        let conn = guard.as_mut().ok_or(CatalogError::SessionClosed)?;
        f(conn)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.conn.borrow().is_some()
    }

    fn release(&self) -> CatalogResult<()> {
        let Some(conn) = self.conn.borrow_mut().take() else {
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                debug!(
                    "event=session_close module=session status=ok session_id={}",
                    self.id
                );
                Ok(())
            }
            Err((_, err)) => {
                error!(
                    "event=session_close module=session status=error session_id={} error={}",
                    self.id, err
                );
                Err(CatalogError::storage(err))
            }
        }
    }
}

/// Single-use handle to an open catalog connection.
#[derive(Debug)]
pub struct Session {
    state: Rc<SessionState>,
}

impl Session {
    pub(crate) fn new(
        conn: Connection,
        settings: SessionSettings,
        load_strategy: LoadStrategy,
    ) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "event=session_open module=session status=ok session_id={} load_strategy={:?}",
            id, load_strategy
        );
        Self {
            state: Rc::new(SessionState {
                id,
                conn: RefCell::new(Some(conn)),
                settings,
                load_strategy: Cell::new(load_strategy),
            }),
        }
    }

    /// Process-unique id used in log events.
    pub fn id(&self) -> u64 {
        self.state.id
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Strategy applied by queries that do not choose one themselves.
    pub fn load_strategy(&self) -> LoadStrategy {
        self.state.load_strategy()
    }

    pub fn set_load_strategy(&self, strategy: LoadStrategy) {
        self.state.load_strategy.set(strategy);
    }

    /// Category queries and mutations bound to this session.
    pub fn categories(&self) -> SqliteCategoryRepository<'_> {
        SqliteCategoryRepository::new(self)
    }

    /// Product queries and mutations bound to this session.
    pub fn products(&self) -> SqliteProductRepository<'_> {
        SqliteProductRepository::new(self)
    }

    /// Explicitly loads `category.products` (standing filter applies).
    pub fn load_products(&self, category: &mut Category) -> CatalogResult<()> {
        let products = fetch_products_for_category(&self.state, category.id)?;
        category.products.set(products);
        Ok(())
    }

    /// Explicitly loads `product.category`.
    pub fn load_category(&self, product: &mut Product) -> CatalogResult<()> {
        let category = match product.category_id {
            Some(category_id) => fetch_category_by_id(&self.state, category_id)?,
            None => None,
        };
        product.category.set(category);
        Ok(())
    }

    /// Releases the connection and reports close failures.
    pub fn close(self) -> CatalogResult<()> {
        self.state.release()
    }

    pub(crate) fn state(&self) -> &Rc<SessionState> {
        &self.state
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Errors are already logged by `release`.
        let _ = self.state.release();
    }
}
