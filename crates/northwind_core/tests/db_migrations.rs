use northwind_core::db::migrations::latest_version;
use northwind_core::db::{open_db, open_db_in_memory, DbError};
use northwind_core::{
    CatalogConfig, CatalogContext, CatalogError, CatalogResult, CategoryRepository,
    CostConversion, LoadStrategy, Money, ProductRepository,
};
use rusqlite::Connection;
use std::path::Path;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory(CostConversion::Cents).unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "Categories");
    assert_table_exists(&conn, "Products");
    assert_table_exists(&conn, "catalog_meta");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Northwind.db");

    let conn_first = open_db(&path, CostConversion::Cents).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path, CostConversion::Cents).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "Products");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, CostConversion::Cents).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn cost_conversion_is_pinned_by_first_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Northwind.db");

    drop(open_db(&path, CostConversion::Real).unwrap());
    drop(open_db(&path, CostConversion::Real).unwrap());

    let err = open_db(&path, CostConversion::Cents).unwrap_err();
    match err {
        DbError::CostConversionMismatch { stored, configured } => {
            assert_eq!(stored, "real");
            assert_eq!(configured, CostConversion::Cents);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_long_category_names() {
    let conn = open_db_in_memory(CostConversion::Cents).unwrap();

    conn.execute(
        "INSERT INTO Categories (CategoryName) VALUES (?1);",
        ["Fifteen chars.."],
    )
    .unwrap();
    let err = conn
        .execute(
            "INSERT INTO Categories (CategoryName) VALUES (?1);",
            ["Sixteen chars..."],
        )
        .unwrap_err();
    assert!(err.to_string().contains("CHECK"), "unexpected error: {err}");
}

#[test]
fn foreign_keys_are_enforced_for_product_category() {
    let conn = open_db_in_memory(CostConversion::Cents).unwrap();

    let err = conn
        .execute(
            "INSERT INTO Products (ProductName, CategoryID, UnitsInStock) VALUES ('Orphan', 999, 0);",
            [],
        )
        .unwrap_err();
    assert!(
        err.to_string().contains("FOREIGN KEY"),
        "unexpected error: {err}"
    );

    conn.execute(
        "INSERT INTO Products (ProductName, CategoryID, UnitsInStock) VALUES ('Loose', NULL, 0);",
        [],
    )
    .unwrap();
}

#[test]
fn existing_northwind_file_is_adopted_with_real_costs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Northwind.db");
    write_northwind_file(&path);

    let context = CatalogContext::new(
        CatalogConfig::at_path(&path).with_cost_conversion(CostConversion::Real),
    );
    let session = context.open().unwrap();

    let categories = session
        .categories()
        .list_categories_with_products(LoadStrategy::Eager)
        .unwrap()
        .collect::<CatalogResult<Vec<_>>>()
        .unwrap();
    let counts = categories
        .iter()
        .map(|category| (category.name.as_str(), category.products().unwrap().len()))
        .collect::<Vec<_>>();
    // Guaraná Fantástica is discontinued.
    assert_eq!(counts, [("Beverages", 2), ("Condiments", 1)]);
    assert_eq!(
        categories[0].description.as_deref(),
        Some("Soft drinks, coffees, teas, beers, and ales")
    );

    let products = session
        .products()
        .list_all_products_sorted_by_cost()
        .unwrap()
        .collect::<CatalogResult<Vec<_>>>()
        .unwrap();
    let listed = products
        .iter()
        .map(|product| (product.name.as_str(), product.cost, product.stock))
        .collect::<Vec<_>>();
    assert_eq!(
        listed,
        [
            ("Chang", Some(money("19.45")), 17),
            ("Chai", Some(money("18.00")), 39),
            ("Aniseed Syrup", Some(money("10.00")), 0),
        ]
    );

    assert!(session
        .products()
        .add_product(categories[1].id, "Northwoods Syrup", money("25.00"))
        .unwrap());
    session.close().unwrap();

    let conn = Connection::open(&path).unwrap();
    let stored: f64 = conn
        .query_row(
            "SELECT UnitPrice FROM Products WHERE ProductName = 'Northwoods Syrup';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 25.0);
    assert_eq!(schema_version(&conn), latest_version());
}

#[test]
fn existing_northwind_file_rejects_cent_costs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Northwind.db");
    write_northwind_file(&path);

    let err = CatalogContext::new(CatalogConfig::at_path(&path))
        .open()
        .err()
        .unwrap();
    match err {
        CatalogError::StorageUnavailable(DbError::CostConversionMismatch {
            stored,
            configured,
        }) => {
            assert_eq!(stored, "real");
            assert_eq!(configured, CostConversion::Cents);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Classic Northwind layout, as created by tools other than this crate.
fn write_northwind_file(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Categories (
            CategoryID INTEGER PRIMARY KEY,
            CategoryName nvarchar(15) NOT NULL,
            Description ntext,
            Picture image
        );
        CREATE TABLE Products (
            ProductID INTEGER PRIMARY KEY,
            ProductName nvarchar(40) NOT NULL,
            SupplierID int,
            CategoryID int,
            QuantityPerUnit nvarchar(20),
            UnitPrice money DEFAULT 0,
            UnitsInStock smallint,
            UnitsOnOrder smallint,
            ReorderLevel smallint,
            Discontinued bit NOT NULL DEFAULT 0
        );
        INSERT INTO Categories (CategoryID, CategoryName, Description) VALUES
            (1, 'Beverages', 'Soft drinks, coffees, teas, beers, and ales'),
            (2, 'Condiments', NULL);
        INSERT INTO Products
            (ProductID, ProductName, SupplierID, CategoryID, UnitPrice, UnitsInStock, Discontinued)
        VALUES
            (1, 'Chai', 1, 1, 18, 39, 0),
            (2, 'Chang', 1, 1, 19.45, 17, 0),
            (3, 'Aniseed Syrup', 1, 2, 10, NULL, 0),
            (4, 'Guaraná Fantástica', 10, 1, 4.5, 20, 1);",
    )
    .unwrap();
}

fn money(text: &str) -> Money {
    text.parse().unwrap()
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
