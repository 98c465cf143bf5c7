//! Category queries, relationship fetches and inserts over SQLite.
//!
//! # Responsibility
//! - List categories with `Category.products` loaded per strategy.
//! - Push relationship filters (filtered includes) into the child fetch.
//! - Serve deferred and explicit relationship loads for sessions.
//!
//! # Invariants
//! - Categories are listed by ascending id; children by ascending id.
//! - Cursor pages resume after the last `CategoryID` handed out.
//! - The standing discontinued filter also applies to relationship fetches.
//! - A filtered include is always fetched eagerly, so a category's product
//!   count reflects only rows that pass the filter.

use crate::model::category::{Category, CategoryId, NewCategory, PRODUCTS_RELATION};
use crate::model::product::Product;
use crate::repo::error::{CatalogError, CatalogResult};
use crate::repo::product_repo::{parse_product_row, PRODUCT_COLUMNS};
use crate::repo::sql::{log_mutation, placeholders, query_all, query_page};
use crate::session::cursor::Cursor;
use crate::session::relation::{LoadStrategy, Related};
use crate::session::{Session, SessionSettings, SessionState};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, Row};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::time::Instant;

const CATEGORY_SELECT_SQL: &str =
    "SELECT CategoryID AS id, CategoryName AS name, Description AS description FROM Categories";
const CATEGORY_PAGE_SQL: &str = "WHERE CategoryID > ? ORDER BY CategoryID ASC";

/// Options for category listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryQuery {
    /// Overrides the session strategy for `Category.products`.
    pub load_strategy: Option<LoadStrategy>,
    /// Filtered include: only products with `stock >= value` are loaded.
    pub min_stock: Option<i64>,
}

impl CategoryQuery {
    /// Effective strategy; filtered includes are always eager.
    fn strategy(&self, session_default: LoadStrategy) -> LoadStrategy {
        if self.min_stock.is_some() {
            return LoadStrategy::Eager;
        }
        self.load_strategy.unwrap_or(session_default)
    }
}

/// Repository interface for category queries and inserts.
pub trait CategoryRepository {
    /// All categories with `Category.products` populated per `strategy`.
    fn list_categories_with_products(
        &self,
        strategy: LoadStrategy,
    ) -> CatalogResult<Cursor<Category>>;
    /// All categories; each one's products pre-filtered to `stock >= min_stock`.
    fn list_categories_filtered_by_stock(&self, min_stock: i64)
        -> CatalogResult<Cursor<Category>>;
    fn query_categories(&self, query: &CategoryQuery) -> CatalogResult<Cursor<Category>>;
    fn get_category(&self, id: CategoryId) -> CatalogResult<Option<Category>>;
    fn add_category(&self, category: &NewCategory) -> CatalogResult<CategoryId>;
    /// SQL statements `query_categories` runs for `query`, for diagnostics.
    fn to_query_string(&self, query: &CategoryQuery) -> String;
}

/// SQLite-backed category repository bound to one session.
pub struct SqliteCategoryRepository<'s> {
    session: &'s Session,
}

impl<'s> SqliteCategoryRepository<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    fn state(&self) -> &Rc<SessionState> {
        self.session.state()
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn list_categories_with_products(
        &self,
        strategy: LoadStrategy,
    ) -> CatalogResult<Cursor<Category>> {
        self.query_categories(&CategoryQuery {
            load_strategy: Some(strategy),
            min_stock: None,
        })
    }

    fn list_categories_filtered_by_stock(
        &self,
        min_stock: i64,
    ) -> CatalogResult<Cursor<Category>> {
        self.query_categories(&CategoryQuery {
            load_strategy: Some(LoadStrategy::Eager),
            min_stock: Some(min_stock),
        })
    }

    fn query_categories(&self, query: &CategoryQuery) -> CatalogResult<Cursor<Category>> {
        let state = self.state();
        let strategy = query.strategy(state.load_strategy());
        let min_stock = query.min_stock;
        let sql = format!("{CATEGORY_SELECT_SQL} {CATEGORY_PAGE_SQL}");
        debug!(
            "event=category_query module=repo status=start session_id={} strategy={:?} min_stock={:?}",
            self.session.id(),
            strategy,
            min_stock
        );

        let mut after = CategoryId::MIN;
        let cursor = Cursor::new(
            state,
            state.settings().fetch_batch_size,
            Box::new(move |state: &Rc<SessionState>, limit: u32| {
                let mut page = state.with_conn(|conn| {
                    query_page(conn, &sql, &[Value::Integer(after)], limit, |row| {
                        parse_category_row(state, row, strategy == LoadStrategy::Lazy)
                    })
                })?;
                if let Some(last) = page.last() {
                    after = last.id;
                }
                if strategy == LoadStrategy::Eager {
                    attach_products(state, &mut page, min_stock)?;
                }
                Ok(page)
            }),
        );
        cursor.prime()
    }

    fn get_category(&self, id: CategoryId) -> CatalogResult<Option<Category>> {
        let state = self.state();
        let mut found = fetch_category_by_id(state, id)?;
        if state.load_strategy() == LoadStrategy::Eager {
            if let Some(category) = found.as_mut() {
                let products = fetch_products_for_categories(state, &[category.id], None, false)?
                    .remove(&category.id)
                    .unwrap_or_default();
                category.products.set(products);
            }
        }
        Ok(found)
    }

    fn add_category(&self, category: &NewCategory) -> CatalogResult<CategoryId> {
        let started_at = Instant::now();
        let result = insert_category(self.state(), category);
        log_mutation("add_category", self.session.id(), started_at, &result);
        result
    }

    fn to_query_string(&self, query: &CategoryQuery) -> String {
        let settings = self.state().settings();
        let parents = format!("{CATEGORY_SELECT_SQL} {CATEGORY_PAGE_SQL} LIMIT ?;");
        match query.strategy(self.state().load_strategy()) {
            LoadStrategy::Eager => format!(
                "{parents}\n{};",
                products_relation_sql(settings, "?, ...", query.min_stock.is_some())
            ),
            LoadStrategy::Lazy | LoadStrategy::Explicit => parents,
        }
    }
}

fn insert_category(state: &Rc<SessionState>, category: &NewCategory) -> CatalogResult<CategoryId> {
    category.validate()?;

    state.with_conn_mut(|conn| {
        let tx = conn.transaction().map_err(CatalogError::storage)?;
        let changed = tx
            .execute(
                "INSERT INTO Categories (CategoryName, Description) VALUES (?1, ?2);",
                params![category.name.as_str(), category.description.as_deref()],
            )
            .map_err(CatalogError::storage)?;
        if changed != 1 {
            return Err(CatalogError::Inconsistency {
                expected: 1,
                actual: changed,
            });
        }
        let id = tx.last_insert_rowid();
        tx.commit().map_err(CatalogError::storage)?;
        Ok(id)
    })
}

fn products_relation_sql(settings: &SessionSettings, keys: &str, with_min_stock: bool) -> String {
    let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM Products WHERE CategoryID IN ({keys})");
    if settings.exclude_discontinued {
        sql.push_str(" AND Discontinued = 0");
    }
    if with_min_stock {
        sql.push_str(" AND UnitsInStock >= ?");
    }
    sql.push_str(" ORDER BY CategoryID ASC, ProductID ASC");
    sql
}

/// Batched child fetch for a page of categories.
fn fetch_products_for_categories(
    state: &Rc<SessionState>,
    category_ids: &[CategoryId],
    min_stock: Option<i64>,
    lazy_children: bool,
) -> CatalogResult<HashMap<CategoryId, Vec<Product>>> {
    let mut grouped: HashMap<CategoryId, Vec<Product>> = HashMap::new();
    if category_ids.is_empty() {
        return Ok(grouped);
    }

    let sql = products_relation_sql(
        state.settings(),
        &placeholders(category_ids.len()),
        min_stock.is_some(),
    );
    let mut bind_values = category_ids
        .iter()
        .map(|id| Value::Integer(*id))
        .collect::<Vec<_>>();
    if let Some(min_stock) = min_stock {
        bind_values.push(Value::Integer(min_stock));
    }

    let products = state.with_conn(|conn| {
        query_all(conn, &sql, &bind_values, |row| {
            parse_product_row(state, row, lazy_children)
        })
    })?;
    for product in products {
        if let Some(category_id) = product.category_id {
            grouped.entry(category_id).or_default().push(product);
        }
    }

    Ok(grouped)
}

fn attach_products(
    state: &Rc<SessionState>,
    categories: &mut [Category],
    min_stock: Option<i64>,
) -> CatalogResult<()> {
    let ids = categories
        .iter()
        .map(|category| category.id)
        .collect::<Vec<_>>();
    let mut grouped = fetch_products_for_categories(state, &ids, min_stock, false)?;

    for category in categories.iter_mut() {
        let products = grouped.remove(&category.id).unwrap_or_default();
        category.products.set(products);
    }
    Ok(())
}

/// Deferred or explicit load of one category's products.
pub(crate) fn fetch_products_for_category(
    state: &Rc<SessionState>,
    category_id: CategoryId,
) -> CatalogResult<Vec<Product>> {
    let lazy_children = state.load_strategy() == LoadStrategy::Lazy;
    let mut grouped = fetch_products_for_categories(state, &[category_id], None, lazy_children)?;
    Ok(grouped.remove(&category_id).unwrap_or_default())
}

/// Deferred or explicit load of one product's category.
pub(crate) fn fetch_category_by_id(
    state: &Rc<SessionState>,
    category_id: CategoryId,
) -> CatalogResult<Option<Category>> {
    let lazy = state.load_strategy() == LoadStrategy::Lazy;
    let sql = format!("{CATEGORY_SELECT_SQL} WHERE CategoryID = ?");
    let mut found = state.with_conn(|conn| {
        query_all(conn, &sql, &[Value::Integer(category_id)], |row| {
            parse_category_row(state, row, lazy)
        })
    })?;
    Ok(found.pop())
}

/// Batched parent fetch for a page of products.
pub(crate) fn fetch_categories_by_ids(
    state: &Rc<SessionState>,
    category_ids: &BTreeSet<CategoryId>,
) -> CatalogResult<HashMap<CategoryId, Category>> {
    if category_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "{CATEGORY_SELECT_SQL} WHERE CategoryID IN ({})",
        placeholders(category_ids.len())
    );
    let bind_values = category_ids
        .iter()
        .map(|id| Value::Integer(*id))
        .collect::<Vec<_>>();

    let categories = state.with_conn(|conn| {
        query_all(conn, &sql, &bind_values, |row| {
            parse_category_row(state, row, false)
        })
    })?;
    Ok(categories
        .into_iter()
        .map(|category| (category.id, category))
        .collect())
}

fn parse_category_row(
    state: &Rc<SessionState>,
    row: &Row<'_>,
    lazy: bool,
) -> CatalogResult<Category> {
    let id: CategoryId = row.get("id")?;
    let products = if lazy {
        Related::lazy(PRODUCTS_RELATION, state, id, fetch_products_for_category)
    } else {
        Related::not_loaded(PRODUCTS_RELATION)
    };

    Ok(Category {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        products,
    })
}
