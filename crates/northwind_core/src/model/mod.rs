//! Catalog schema model.
//!
//! # Responsibility
//! - Declare the `Category` and `Product` entity shapes and their relationship.
//! - Own declaration-level constraints (name widths, stock, money precision).
//!
//! # Invariants
//! - Identifiers are assigned by storage and never change afterwards.
//! - Monetary values are fixed-point cents; no floating-point arithmetic.
//! - Entities are never physically deleted by core APIs.

pub mod category;
pub mod money;
pub mod product;
pub mod validation;
