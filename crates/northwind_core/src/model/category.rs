//! Category entity.
//!
//! # Invariants
//! - `name` is required and at most 15 characters. The same limit is declared
//!   as a `CHECK` constraint on `categories.name`.
//! - `products` follows the loading strategy of the query that produced it.

use crate::model::product::Product;
use crate::model::validation::{validate_name, ModelValidationError};
use crate::repo::error::CatalogResult;
use crate::session::relation::Related;
use serde::Serialize;

/// Storage-assigned category identifier.
pub type CategoryId = i64;

/// Maximum category name width in characters.
pub const CATEGORY_NAME_MAX_CHARS: usize = 15;

pub(crate) const PRODUCTS_RELATION: &str = "Category.products";

/// Product grouping. Owns zero or more products.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub(crate) products: Related<Vec<Product>>,
}

impl Category {
    /// Products in this category, as filtered by the loading query.
    ///
    /// # Errors
    /// - `SessionClosed` for a lazy relationship whose session is gone.
    /// - `RelationNotLoaded` for an explicit relationship not yet loaded.
    pub fn products(&self) -> CatalogResult<&[Product]> {
        self.products.get().map(Vec::as_slice)
    }

    pub fn products_loaded(&self) -> bool {
        self.products.is_loaded()
    }
}

/// Staged insert for a new category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_name("category", &self.name, CATEGORY_NAME_MAX_CHARS)
    }
}

#[cfg(test)]
mod tests {
    use super::NewCategory;
    use crate::model::validation::ModelValidationError;

    #[test]
    fn fifteen_characters_is_the_limit() {
        assert!(NewCategory::new("Dairy Products!").validate().is_ok());
        assert!(matches!(
            NewCategory::new("Dairy Products!!").validate(),
            Err(ModelValidationError::NameTooLong { max: 15, actual: 16, .. })
        ));
    }
}
