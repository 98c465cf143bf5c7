//! Product queries and mutations over SQLite.
//!
//! # Responsibility
//! - Build product queries, including the standing discontinued filter.
//! - Stage and commit product inserts and price changes.
//!
//! # Invariants
//! - Every product query adds `Discontinued = 0` unless the context disables
//!   the standing filter or the query sets `ignore_query_filters`.
//! - Cost-ordered results break ties by ascending id.
//! - Cursor pages resume after the last `(UnitPrice, ProductID)` handed out.
//! - Price updates touch exactly one row or roll back.

use crate::db::cost::{cost_from_sql, cost_to_sql};
use crate::model::category::{Category, CategoryId};
use crate::model::money::Money;
use crate::model::product::{NewProduct, Product, ProductId, CATEGORY_RELATION};
use crate::model::validation::ModelValidationError;
use crate::repo::category_repo::{fetch_categories_by_ids, fetch_category_by_id};
use crate::repo::error::{CatalogError, CatalogResult};
use crate::repo::sql::{bool_to_int, escape_like, log_mutation, parse_flag, query_all, query_page};
use crate::session::cursor::Cursor;
use crate::session::relation::{LoadStrategy, Related};
use crate::session::{Session, SessionSettings, SessionState};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Instant;

/// Northwind `Products` columns, aliased to the names rows are decoded by.
pub(crate) const PRODUCT_COLUMNS: &str = "ProductID AS id, ProductName AS name, \
     CategoryID AS category_id, UnitPrice AS cost, UnitsInStock AS stock, \
     Discontinued AS discontinued";

/// Result ordering for product queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrder {
    #[default]
    Id,
    /// Highest cost first, `NULL` costs last, ties by id.
    CostDescending,
}

/// Filter options for product queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// `cost > value`.
    pub min_cost_exclusive: Option<Money>,
    /// `stock >= value`.
    pub min_stock: Option<i64>,
    /// Case-insensitive substring match on name (Unicode lowercase).
    pub name_contains: Option<String>,
    /// Case-sensitive prefix match on name.
    pub name_starts_with: Option<String>,
    pub category_id: Option<CategoryId>,
    pub order: ProductOrder,
    /// Bypasses the standing discontinued filter.
    pub ignore_query_filters: bool,
    /// Overrides the session strategy for `Product.category`.
    pub load_strategy: Option<LoadStrategy>,
}

/// Repository interface for product queries and mutations.
pub trait ProductRepository {
    /// Products with `cost > min_price`, highest cost first.
    fn list_expensive_products(&self, min_price: Money) -> CatalogResult<Cursor<Product>>;
    /// Products whose name contains `substring`, ignoring case.
    fn search_products_by_name(&self, substring: &str) -> CatalogResult<Cursor<Product>>;
    /// All visible products, highest cost first.
    fn list_all_products_sorted_by_cost(&self) -> CatalogResult<Cursor<Product>>;
    fn query_products(&self, query: &ProductQuery) -> CatalogResult<Cursor<Product>>;
    fn get_product(&self, id: ProductId) -> CatalogResult<Option<Product>>;
    /// Inserts an active product; `true` when exactly one row was written.
    fn add_product(&self, category_id: CategoryId, name: &str, cost: Money)
        -> CatalogResult<bool>;
    fn create_product(&self, product: &NewProduct) -> CatalogResult<ProductId>;
    /// Adds `amount` to the first product (by id) whose name starts with
    /// `name_prefix`.
    fn increase_product_price(&self, name_prefix: &str, amount: Money) -> CatalogResult<bool>;
}

/// SQLite-backed product repository bound to one session.
pub struct SqliteProductRepository<'s> {
    session: &'s Session,
}

impl<'s> SqliteProductRepository<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    fn state(&self) -> &Rc<SessionState> {
        self.session.state()
    }

    fn insert(&self, product: &NewProduct) -> CatalogResult<(usize, ProductId)> {
        product.validate()?;
        let conversion = self.state().settings().cost_conversion;

        self.state().with_conn_mut(|conn| {
            let tx = conn.transaction().map_err(CatalogError::storage)?;
            let changed = tx
                .execute(
                    "INSERT INTO Products (
                        ProductName,
                        CategoryID,
                        UnitPrice,
                        UnitsInStock,
                        Discontinued
                    ) VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![
                        product.name.as_str(),
                        product.category_id,
                        product.cost.map(|cost| cost_to_sql(conversion, cost)),
                        product.stock,
                        bool_to_int(product.discontinued),
                    ],
                )
                .map_err(CatalogError::storage)?;
            let id = tx.last_insert_rowid();
            tx.commit().map_err(CatalogError::storage)?;
            Ok((changed, id))
        })
    }
}

impl ProductRepository for SqliteProductRepository<'_> {
    fn list_expensive_products(&self, min_price: Money) -> CatalogResult<Cursor<Product>> {
        self.query_products(&ProductQuery {
            min_cost_exclusive: Some(min_price),
            order: ProductOrder::CostDescending,
            ..ProductQuery::default()
        })
    }

    fn search_products_by_name(&self, substring: &str) -> CatalogResult<Cursor<Product>> {
        if substring.trim().is_empty() {
            return Ok(Cursor::empty());
        }

        self.query_products(&ProductQuery {
            name_contains: Some(substring.to_string()),
            ..ProductQuery::default()
        })
    }

    fn list_all_products_sorted_by_cost(&self) -> CatalogResult<Cursor<Product>> {
        self.query_products(&ProductQuery {
            order: ProductOrder::CostDescending,
            ..ProductQuery::default()
        })
    }

    fn query_products(&self, query: &ProductQuery) -> CatalogResult<Cursor<Product>> {
        let state = self.state();
        let settings = *state.settings();
        let strategy = query.load_strategy.unwrap_or_else(|| state.load_strategy());
        let product_sql = build_product_sql(&settings, query);
        debug!(
            "event=product_query module=repo status=start session_id={} strategy={:?}",
            self.session.id(),
            strategy
        );

        let mut after: Option<ProductKey> = None;
        let cursor = Cursor::new(
            state,
            settings.fetch_batch_size,
            Box::new(move |state: &Rc<SessionState>, limit: u32| {
                let (sql, bind_values) = product_sql.page(after.as_ref());
                let rows = state.with_conn(|conn| {
                    query_page(conn, &sql, &bind_values, limit, |row| {
                        let key = ProductKey {
                            id: row.get("id")?,
                            unit_price: row.get("cost")?,
                        };
                        let product =
                            parse_product_row(state, row, strategy == LoadStrategy::Lazy)?;
                        Ok((key, product))
                    })
                })?;
                if let Some((key, _)) = rows.last() {
                    after = Some(key.clone());
                }

                let mut page = rows
                    .into_iter()
                    .map(|(_, product)| product)
                    .collect::<Vec<_>>();
                if strategy == LoadStrategy::Eager {
                    attach_categories(state, &mut page)?;
                }
                Ok(page)
            }),
        );
        cursor.prime()
    }

    fn get_product(&self, id: ProductId) -> CatalogResult<Option<Product>> {
        let state = self.state();
        let settings = state.settings();
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM Products WHERE ProductID = ?");
        if settings.exclude_discontinued {
            sql.push_str(" AND Discontinued = 0");
        }
        let lazy = state.load_strategy() == LoadStrategy::Lazy;

        let mut found = state.with_conn(|conn| {
            query_all(conn, &sql, &[Value::Integer(id)], |row| {
                parse_product_row(state, row, lazy)
            })
        })?;
        if state.load_strategy() == LoadStrategy::Eager {
            attach_categories(state, &mut found)?;
        }
        Ok(found.pop())
    }

    fn add_product(
        &self,
        category_id: CategoryId,
        name: &str,
        cost: Money,
    ) -> CatalogResult<bool> {
        let started_at = Instant::now();
        let result = self
            .insert(&NewProduct::new(category_id, name, cost))
            .map(|(changed, _)| changed == 1);
        log_mutation("add_product", self.session.id(), started_at, &result);
        result
    }

    fn create_product(&self, product: &NewProduct) -> CatalogResult<ProductId> {
        let started_at = Instant::now();
        let result = self.insert(product).and_then(|(changed, id)| {
            if changed != 1 {
                return Err(CatalogError::Inconsistency {
                    expected: 1,
                    actual: changed,
                });
            }
            Ok(id)
        });
        log_mutation("create_product", self.session.id(), started_at, &result);
        result
    }

    fn increase_product_price(&self, name_prefix: &str, amount: Money) -> CatalogResult<bool> {
        let started_at = Instant::now();
        let result = increase_price(self.state(), name_prefix, amount);
        log_mutation(
            "increase_product_price",
            self.session.id(),
            started_at,
            &result,
        );
        result
    }
}

fn increase_price(
    state: &Rc<SessionState>,
    name_prefix: &str,
    amount: Money,
) -> CatalogResult<bool> {
    if name_prefix.is_empty() {
        return Err(ModelValidationError::EmptySearchTerm.into());
    }

    let settings = *state.settings();
    let mut lookup_sql = String::from(
        "SELECT ProductID, UnitPrice FROM Products WHERE instr(ProductName, ?1) = 1",
    );
    if settings.exclude_discontinued {
        lookup_sql.push_str(" AND Discontinued = 0");
    }
    lookup_sql.push_str(" ORDER BY ProductID ASC LIMIT 1;");

    state.with_conn_mut(|conn| {
        let tx = conn.transaction().map_err(CatalogError::storage)?;

        let target: Option<(ProductId, Value)> = tx
            .query_row(&lookup_sql, [name_prefix], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        let Some((id, stored_cost)) = target else {
            return Err(CatalogError::NotFound(format!(
                "product with name starting `{name_prefix}`"
            )));
        };

        let current = cost_from_sql(settings.cost_conversion, (&stored_cost).into())
            .map_err(CatalogError::InvalidData)?
            .unwrap_or(Money::ZERO);
        let updated = current.checked_add(amount).ok_or_else(|| {
            ModelValidationError::InvalidMoney(format!("{current} + {amount} overflows"))
        })?;

        let changed = tx
            .execute(
                "UPDATE Products SET UnitPrice = ?1 WHERE ProductID = ?2;",
                params![cost_to_sql(settings.cost_conversion, updated), id],
            )
            .map_err(CatalogError::storage)?;
        if changed != 1 {
            // Dropping `tx` rolls the update back.
            return Err(CatalogError::Inconsistency {
                expected: 1,
                actual: changed,
            });
        }

        tx.commit().map_err(CatalogError::storage)?;
        debug!("event=product_price_changed module=repo product_id={id} from={current} to={updated}");
        Ok(true)
    })
}

/// Filtered product query without its paging clause.
struct ProductSql {
    filter: String,
    bind_values: Vec<Value>,
    order: ProductOrder,
}

/// Last row handed out by a product cursor.
#[derive(Debug, Clone)]
struct ProductKey {
    id: ProductId,
    /// Raw stored `UnitPrice`, so the next page compares against exactly what
    /// storage holds.
    unit_price: Value,
}

impl ProductSql {
    /// SQL and bindings for the page following `after`.
    fn page(&self, after: Option<&ProductKey>) -> (String, Vec<Value>) {
        let mut sql = self.filter.clone();
        let mut bind_values = self.bind_values.clone();

        if let Some(after) = after {
            match (self.order, &after.unit_price) {
                (ProductOrder::Id, _) => {
                    sql.push_str(" AND ProductID > ?");
                    bind_values.push(Value::Integer(after.id));
                }
                (ProductOrder::CostDescending, Value::Null) => {
                    sql.push_str(" AND UnitPrice IS NULL AND ProductID > ?");
                    bind_values.push(Value::Integer(after.id));
                }
                (ProductOrder::CostDescending, unit_price) => {
                    sql.push_str(
                        " AND (UnitPrice < ? OR (UnitPrice = ? AND ProductID > ?) OR UnitPrice IS NULL)",
                    );
                    bind_values.push(unit_price.clone());
                    bind_values.push(unit_price.clone());
                    bind_values.push(Value::Integer(after.id));
                }
            }
        }

        match self.order {
            ProductOrder::Id => sql.push_str(" ORDER BY ProductID ASC"),
            ProductOrder::CostDescending => {
                sql.push_str(" ORDER BY UnitPrice DESC NULLS LAST, ProductID ASC")
            }
        }
        (sql, bind_values)
    }
}

fn build_product_sql(settings: &SessionSettings, query: &ProductQuery) -> ProductSql {
    let mut filter = format!("SELECT {PRODUCT_COLUMNS} FROM Products WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();

    if settings.exclude_discontinued && !query.ignore_query_filters {
        filter.push_str(" AND Discontinued = 0");
    }

    if let Some(min_cost) = query.min_cost_exclusive {
        filter.push_str(" AND UnitPrice > ?");
        bind_values.push(cost_to_sql(settings.cost_conversion, min_cost));
    }

    if let Some(min_stock) = query.min_stock {
        filter.push_str(" AND UnitsInStock >= ?");
        bind_values.push(Value::Integer(min_stock));
    }

    if let Some(term) = &query.name_contains {
        // `catalog_fold` is registered on every connection by `db::open`.
        filter.push_str(" AND catalog_fold(ProductName) LIKE ? ESCAPE '\\'");
        bind_values.push(Value::Text(format!(
            "%{}%",
            escape_like(&term.to_lowercase())
        )));
    }

    if let Some(prefix) = &query.name_starts_with {
        filter.push_str(" AND instr(ProductName, ?) = 1");
        bind_values.push(Value::Text(prefix.clone()));
    }

    if let Some(category_id) = query.category_id {
        filter.push_str(" AND CategoryID = ?");
        bind_values.push(Value::Integer(category_id));
    }

    ProductSql {
        filter,
        bind_values,
        order: query.order,
    }
}

/// Decodes one `PRODUCT_COLUMNS` row. `lazy` attaches a deferred
/// `Product.category` loader; otherwise the relation starts unloaded.
pub(crate) fn parse_product_row(
    state: &Rc<SessionState>,
    row: &Row<'_>,
    lazy: bool,
) -> CatalogResult<Product> {
    let id: ProductId = row.get("id")?;
    let category_id: Option<CategoryId> = row.get("category_id")?;

    let cost = cost_from_sql(state.settings().cost_conversion, row.get_ref("cost")?)
        .map_err(|message| CatalogError::InvalidData(format!("product {id}: {message}")))?;

    // Northwind leaves `UnitsInStock` nullable; a missing count is zero.
    let stock = row.get::<_, Option<i64>>("stock")?.unwrap_or(0);
    if stock < 0 {
        return Err(CatalogError::InvalidData(format!(
            "negative stock `{stock}` in Products.UnitsInStock for product {id}"
        )));
    }

    let category = match category_id {
        None => Related::loaded(CATEGORY_RELATION, None),
        Some(key) if lazy => Related::lazy(CATEGORY_RELATION, state, key, fetch_category_by_id),
        Some(_) => Related::not_loaded(CATEGORY_RELATION),
    };

    Ok(Product {
        id,
        name: row.get("name")?,
        category_id,
        cost,
        stock,
        discontinued: parse_flag(row.get("discontinued")?, "Products.Discontinued")?,
        category,
    })
}

fn attach_categories(state: &Rc<SessionState>, products: &mut [Product]) -> CatalogResult<()> {
    let ids = products
        .iter()
        .filter_map(|product| product.category_id)
        .collect::<BTreeSet<_>>();
    if ids.is_empty() {
        return Ok(());
    }

    let categories = fetch_categories_by_ids(state, &ids)?;
    for product in products.iter_mut() {
        if let Some(category_id) = product.category_id {
            let category: Option<Category> = categories.get(&category_id).cloned();
            product.category.set(category);
        }
    }
    Ok(())
}
