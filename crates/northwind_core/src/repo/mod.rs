//! Repository layer: catalog queries and mutations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate the staged entity before any SQL runs.
//! - Repository APIs return semantic errors (`NotFound`, `Inconsistency`) in
//!   addition to storage errors; nothing is swallowed or retried.

pub mod category_repo;
pub mod error;
pub mod product_repo;
mod sql;
