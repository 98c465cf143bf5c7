//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `northwind_core` linkage and print the core version.
//! - With a database path argument, print category product counts and the
//!   product table from that catalog.
//! - Log to `<db dir>/logs`; a logging failure is reported but not fatal.

use northwind_core::{
    default_log_level, init_logging, CatalogConfig, CatalogContext, CatalogResult,
    CatalogService, LoadStrategy,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("northwind_core version={}", northwind_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let db_path = absolute(Path::new(&db_path));
    let log_dir = db_path
        .parent()
        .map_or_else(|| PathBuf::from("logs"), |dir| dir.join("logs"));
    if let Err(err) = init_logging(default_log_level(), &log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }

    match print_catalog(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error [{}]: {err}", err.code());
            ExitCode::FAILURE
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn print_catalog(db_path: &Path) -> CatalogResult<()> {
    let service = CatalogService::new(CatalogContext::new(CatalogConfig::at_path(db_path)));

    println!("Categories and how many products they have:");
    for summary in service.category_product_counts(LoadStrategy::Eager)? {
        println!("{} has {} products.", summary.name, summary.product_count);
    }

    println!("Products, highest cost first:");
    for product in service.product_table()? {
        let cost = product
            .cost
            .map(|cost| cost.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{}: {} costs {} and has {} in stock.",
            product.id, product.name, cost, product.stock
        );
    }

    Ok(())
}
