mod common;

use common::{seeded_catalog, seeded_catalog_with};
use northwind_core::{
    CatalogConfig, CatalogContext, CatalogError, CatalogResult, Category, CategoryRepository,
    LoadStrategy, ProductQuery, ProductRepository,
};

fn product_counts(categories: &[Category]) -> Vec<(String, usize)> {
    categories
        .iter()
        .map(|category| {
            (
                category.name.clone(),
                category.products().unwrap().len(),
            )
        })
        .collect()
}

fn expected_counts() -> Vec<(String, usize)> {
    [("Beverages", 3), ("Condiments", 2), ("Seafood", 2), ("Produce", 0)]
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect()
}

#[test]
fn eager_products_stay_available_after_close() {
    let catalog = seeded_catalog();
    let session = catalog.context.open().unwrap();

    let categories = session
        .categories()
        .list_categories_with_products(LoadStrategy::Eager)
        .unwrap()
        .collect::<CatalogResult<Vec<_>>>()
        .unwrap();
    session.close().unwrap();

    assert!(categories.iter().all(Category::products_loaded));
    assert_eq!(product_counts(&categories), expected_counts());
}

#[test]
fn lazy_products_load_on_first_access_while_open() {
    let catalog = seeded_catalog();
    let session = catalog.context.open().unwrap();

    let categories = session
        .categories()
        .list_categories_with_products(LoadStrategy::Lazy)
        .unwrap()
        .collect::<CatalogResult<Vec<_>>>()
        .unwrap();
    assert!(!categories[0].products_loaded());

    assert_eq!(product_counts(&categories), expected_counts());
    assert!(categories.iter().all(Category::products_loaded));
    session.close().unwrap();
}

#[test]
fn lazy_products_fail_after_close() {
    let catalog = seeded_catalog();
    let session = catalog.context.open().unwrap();

    let categories = session
        .categories()
        .list_categories_with_products(LoadStrategy::Lazy)
        .unwrap()
        .collect::<CatalogResult<Vec<_>>>()
        .unwrap();
    assert_eq!(categories[0].products().unwrap().len(), 3);
    session.close().unwrap();

    for category in &categories {
        assert!(
            matches!(category.products(), Err(CatalogError::SessionClosed)),
            "{} served products after close",
            category.name
        );
        assert!(!category.products_loaded());
    }
}

#[test]
fn explicit_products_require_a_load_call() {
    let catalog = seeded_catalog();
    let session = catalog.context.open().unwrap();

    let mut categories = session
        .categories()
        .list_categories_with_products(LoadStrategy::Explicit)
        .unwrap()
        .collect::<CatalogResult<Vec<_>>>()
        .unwrap();
    assert!(matches!(
        categories[0].products(),
        Err(CatalogError::RelationNotLoaded(_))
    ));

    for category in &mut categories {
        session.load_products(category).unwrap();
    }
    session.close().unwrap();

    assert_eq!(product_counts(&categories), expected_counts());
}

#[test]
fn all_strategies_agree_on_product_counts() {
    for strategy in [LoadStrategy::Eager, LoadStrategy::Lazy, LoadStrategy::Explicit] {
        let catalog = seeded_catalog_with(|config| config.with_load_strategy(strategy));
        let session = catalog.context.open().unwrap();
        assert_eq!(session.load_strategy(), strategy);

        let mut categories = session
            .categories()
            .query_categories(&Default::default())
            .unwrap()
            .collect::<CatalogResult<Vec<_>>>()
            .unwrap();
        if strategy == LoadStrategy::Explicit {
            for category in &mut categories {
                session.load_products(category).unwrap();
            }
        }

        assert_eq!(
            product_counts(&categories),
            expected_counts(),
            "strategy {strategy:?}"
        );
    }
}

#[test]
fn product_category_follows_strategy() {
    let catalog = seeded_catalog();
    let session = catalog.context.open().unwrap();
    let products = session.products();

    let eager = products
        .query_products(&ProductQuery {
            name_starts_with: Some("Ikura".to_string()),
            load_strategy: Some(LoadStrategy::Eager),
            ..ProductQuery::default()
        })
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    let seafood = eager.category().unwrap().unwrap();
    assert_eq!(seafood.id, catalog.seafood);
    assert_eq!(seafood.name, "Seafood");
    // Relations of related entities are not loaded transitively.
    assert!(matches!(
        seafood.products(),
        Err(CatalogError::RelationNotLoaded(_))
    ));

    let mut explicit = products
        .search_products_by_name("konbu")
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert!(matches!(
        explicit.category(),
        Err(CatalogError::RelationNotLoaded(_))
    ));
    session.load_category(&mut explicit).unwrap();
    assert_eq!(explicit.category().unwrap().unwrap().name, "Seafood");
}

#[test]
fn uncategorized_product_has_no_category_under_every_strategy() {
    let catalog = seeded_catalog();
    let session = catalog.context.open().unwrap();

    for strategy in [LoadStrategy::Eager, LoadStrategy::Lazy, LoadStrategy::Explicit] {
        let mystery = session
            .products()
            .query_products(&ProductQuery {
                name_starts_with: Some("Mystery".to_string()),
                load_strategy: Some(strategy),
                ..ProductQuery::default()
            })
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(mystery.category_id, None);
        assert!(mystery.category().unwrap().is_none(), "strategy {strategy:?}");
    }
}

#[test]
fn lazy_product_category_fails_after_close() {
    let catalog = seeded_catalog_with(|config| config.with_load_strategy(LoadStrategy::Lazy));

    let products = catalog
        .context
        .with_session(|session| {
            session
                .products()
                .list_expensive_products(common::usd("100.00"))?
                .collect::<CatalogResult<Vec<_>>>()
        })
        .unwrap();

    assert_eq!(products.len(), 2);
    for product in &products {
        assert!(matches!(
            product.category(),
            Err(CatalogError::SessionClosed)
        ));
    }
}

#[test]
fn cursor_reports_session_closed_once_then_ends() {
    let catalog = seeded_catalog_with(|config| config.with_fetch_batch_size(2));
    let session = catalog.context.open().unwrap();

    let mut cursor = session.products().list_all_products_sorted_by_cost().unwrap();
    assert!(cursor.next().unwrap().is_ok());
    assert!(cursor.next().unwrap().is_ok());
    session.close().unwrap();

    assert!(matches!(
        cursor.next(),
        Some(Err(CatalogError::SessionClosed))
    ));
    assert!(cursor.next().is_none());
}

#[test]
fn unreachable_storage_is_reported_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let context = CatalogContext::new(CatalogConfig::at_path(
        dir.path().join("missing").join("Northwind.db"),
    ));

    let err = context.open().unwrap_err();
    assert!(matches!(err, CatalogError::StorageUnavailable(_)));
    assert_eq!(err.code(), "storage_unavailable");
}
