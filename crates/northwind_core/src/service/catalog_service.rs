//! Catalog use-case service.
//!
//! # Invariants
//! - Every method opens one session and closes it before returning.
//! - Returned entities are detached: lazy relationships report
//!   `SessionClosed` on access.

use crate::context::CatalogContext;
use crate::model::category::{Category, CategoryId, NewCategory};
use crate::model::money::Money;
use crate::model::product::Product;
use crate::repo::category_repo::CategoryRepository;
use crate::repo::error::CatalogResult;
use crate::repo::product_repo::ProductRepository;
use crate::session::relation::LoadStrategy;
use crate::session::Session;

/// Category name with the number of products visible in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub product_count: usize,
}

/// Use-case entry points over one catalog context.
pub struct CatalogService {
    context: CatalogContext,
}

impl CatalogService {
    pub fn new(context: CatalogContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CatalogContext {
        &self.context
    }

    /// Products costing more than `min_price`, highest cost first.
    pub fn expensive_products(&self, min_price: Money) -> CatalogResult<Vec<Product>> {
        self.context.with_session(|session| {
            session
                .products()
                .list_expensive_products(min_price)?
                .collect()
        })
    }

    /// Product count per category, loading products with `strategy`.
    ///
    /// Under `Explicit` each category's products are loaded on request.
    pub fn category_product_counts(
        &self,
        strategy: LoadStrategy,
    ) -> CatalogResult<Vec<CategorySummary>> {
        self.context.with_session(|session| {
            session.set_load_strategy(strategy);
            let mut summaries = Vec::new();
            for category in session
                .categories()
                .list_categories_with_products(strategy)?
            {
                let category = ensure_products(session, category?)?;
                summaries.push(CategorySummary {
                    id: category.id,
                    product_count: category.products()?.len(),
                    name: category.name,
                });
            }
            Ok(summaries)
        })
    }

    /// Categories with products pre-filtered to `stock >= min_stock`.
    pub fn categories_with_stock(&self, min_stock: i64) -> CatalogResult<Vec<Category>> {
        self.context.with_session(|session| {
            session
                .categories()
                .list_categories_filtered_by_stock(min_stock)?
                .collect()
        })
    }

    /// Case-insensitive name search; discontinued products stay hidden.
    pub fn search_products(&self, term: &str) -> CatalogResult<Vec<Product>> {
        self.context.with_session(|session| {
            session.products().search_products_by_name(term)?.collect()
        })
    }

    /// All visible products, highest cost first, for tabular display.
    pub fn product_table(&self) -> CatalogResult<Vec<Product>> {
        self.context.with_session(|session| {
            session
                .products()
                .list_all_products_sorted_by_cost()?
                .collect()
        })
    }

    pub fn add_category(&self, category: &NewCategory) -> CatalogResult<CategoryId> {
        self.context
            .with_session(|session| session.categories().add_category(category))
    }

    pub fn add_product(
        &self,
        category_id: CategoryId,
        name: &str,
        cost: Money,
    ) -> CatalogResult<bool> {
        self.context
            .with_session(|session| session.products().add_product(category_id, name, cost))
    }

    pub fn increase_product_price(&self, name_prefix: &str, amount: Money) -> CatalogResult<bool> {
        self.context.with_session(|session| {
            session
                .products()
                .increase_product_price(name_prefix, amount)
        })
    }
}

fn ensure_products(session: &Session, mut category: Category) -> CatalogResult<Category> {
    if session.load_strategy() == LoadStrategy::Explicit && !category.products_loaded() {
        session.load_products(&mut category)?;
    }
    Ok(category)
}
