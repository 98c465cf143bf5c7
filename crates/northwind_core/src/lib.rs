//! Northwind catalog data access.
//!
//! Categories and products in a local SQLite file, read through scoped
//! sessions with eager, lazy or explicit relationship loading.

pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use context::{CatalogConfig, CatalogContext};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::category::{Category, CategoryId, NewCategory, CATEGORY_NAME_MAX_CHARS};
pub use model::money::{CostConversion, Money};
pub use model::product::{NewProduct, Product, ProductId, PRODUCT_NAME_MAX_CHARS};
pub use model::validation::ModelValidationError;
pub use repo::category_repo::{CategoryQuery, CategoryRepository, SqliteCategoryRepository};
pub use repo::error::{CatalogError, CatalogResult};
pub use repo::product_repo::{
    ProductOrder, ProductQuery, ProductRepository, SqliteProductRepository,
};
pub use service::catalog_service::{CatalogService, CategorySummary};
pub use session::cursor::Cursor;
pub use session::relation::{LoadStrategy, Related};
pub use session::Session;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
