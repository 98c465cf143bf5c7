//! Catalog use-case services.
//!
//! # Responsibility
//! - Run each use case in its own session and hand back owned results.
//! - Keep callers (CLI, UI) decoupled from sessions and cursors.

pub mod catalog_service;
