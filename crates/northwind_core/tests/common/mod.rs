//! Seeded catalog fixture shared by integration tests.

#![allow(dead_code)]

use northwind_core::{
    CatalogConfig, CatalogContext, CategoryId, CategoryRepository, Money, NewCategory,
    NewProduct, ProductRepository,
};
use tempfile::TempDir;

pub struct SeededCatalog {
    // Keeps the database directory alive for the test.
    _dir: TempDir,
    pub context: CatalogContext,
    pub beverages: CategoryId,
    pub condiments: CategoryId,
    pub seafood: CategoryId,
    pub produce: CategoryId,
}

pub fn usd(text: &str) -> Money {
    text.parse().unwrap()
}

pub fn seeded_catalog() -> SeededCatalog {
    seeded_catalog_with(|config| config)
}

/// Seeds four categories and ten products, two of them discontinued.
///
/// Visible products by cost: Bob's Burgers 500.00, Cote de Blaye 263.50,
/// Ikura 31.00, Chang 19.00, Chai 18.00, Aniseed Syrup 10.00, Konbu 6.00,
/// Mystery Box (no cost, no category).
pub fn seeded_catalog_with(configure: impl FnOnce(CatalogConfig) -> CatalogConfig) -> SeededCatalog {
    let dir = tempfile::tempdir().unwrap();
    let config = configure(CatalogConfig::at_path(dir.path().join("Northwind.db")));
    let context = CatalogContext::new(config);

    let session = context.open().unwrap();
    let categories = session.categories();
    let beverages = categories
        .add_category(&NewCategory::new("Beverages").with_description("Soft drinks and teas"))
        .unwrap();
    let condiments = categories.add_category(&NewCategory::new("Condiments")).unwrap();
    let seafood = categories.add_category(&NewCategory::new("Seafood")).unwrap();
    let produce = categories.add_category(&NewCategory::new("Produce")).unwrap();

    let products = session.products();
    let rows: [(Option<CategoryId>, &str, Option<&str>, i64, bool); 10] = [
        (Some(beverages), "Chai", Some("18.00"), 39, false),
        (Some(beverages), "Chang", Some("19.00"), 17, false),
        (Some(beverages), "Cote de Blaye", Some("263.50"), 17, false),
        (Some(beverages), "Guarana Fantastica", Some("4.50"), 20, true),
        (Some(condiments), "Aniseed Syrup", Some("10.00"), 13, false),
        (Some(condiments), "Chef Anton's Gumbo Mix", Some("21.35"), 0, true),
        (Some(condiments), "Bob's Burgers", Some("500.00"), 5, false),
        (Some(seafood), "Ikura", Some("31.00"), 31, false),
        (Some(seafood), "Konbu", Some("6.00"), 24, false),
        (None, "Mystery Box", None, 3, false),
    ];
    for (category_id, name, cost, stock, discontinued) in rows {
        let product = NewProduct {
            category_id,
            name: name.to_string(),
            cost: cost.map(usd),
            stock,
            discontinued,
        };
        products.create_product(&product).unwrap();
    }
    session.close().unwrap();

    SeededCatalog {
        _dir: dir,
        context,
        beverages,
        condiments,
        seafood,
        produce,
    }
}
