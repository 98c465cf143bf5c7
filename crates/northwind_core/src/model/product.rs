//! Product entity.
//!
//! # Invariants
//! - `stock` is never negative.
//! - `category_id` may be `None`; uncategorized products are allowed.
//! - Discontinued products are hidden by the standing filter unless a query
//!   opts out.

use crate::model::category::{Category, CategoryId};
use crate::model::money::Money;
use crate::model::validation::{validate_name, ModelValidationError};
use crate::repo::error::CatalogResult;
use crate::session::relation::Related;
use serde::Serialize;

/// Storage-assigned product identifier.
pub type ProductId = i64;

/// Maximum product name width in characters.
pub const PRODUCT_NAME_MAX_CHARS: usize = 40;

pub(crate) const CATEGORY_RELATION: &str = "Product.category";

/// Catalog item.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub cost: Option<Money>,
    pub stock: i64,
    pub discontinued: bool,
    pub(crate) category: Related<Option<Category>>,
}

impl Product {
    /// Owning category; `None` for uncategorized products.
    ///
    /// # Errors
    /// - `SessionClosed` for a lazy relationship whose session is gone.
    /// - `RelationNotLoaded` for an explicit relationship not yet loaded.
    pub fn category(&self) -> CatalogResult<Option<&Category>> {
        self.category.get().map(Option::as_ref)
    }

    pub fn category_loaded(&self) -> bool {
        self.category.is_loaded()
    }
}

/// Staged insert for a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub cost: Option<Money>,
    pub stock: i64,
    pub discontinued: bool,
}

impl NewProduct {
    /// Active product with zero stock.
    pub fn new(category_id: CategoryId, name: impl Into<String>, cost: Money) -> Self {
        Self {
            category_id: Some(category_id),
            name: name.into(),
            cost: Some(cost),
            stock: 0,
            discontinued: false,
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn discontinued(mut self) -> Self {
        self.discontinued = true;
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_name("product", &self.name, PRODUCT_NAME_MAX_CHARS)?;
        if self.stock < 0 {
            return Err(ModelValidationError::NegativeStock(self.stock));
        }
        Ok(())
    }
}
