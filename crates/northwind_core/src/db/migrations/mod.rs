//! Embedded catalog schema migrations.
//!
//! # Responsibility
//! - Keep the ordered list of schema steps compiled into the binary.
//! - Bring a catalog file up to the latest step in one transaction.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` always equals the last applied step.
//! - A file written by a newer binary is never modified.
//! - Steps only create missing objects, so an unversioned file that already
//!   has the Northwind tables is adopted as is.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "catalog",
        sql: include_str!("0001_catalog.sql"),
    },
    SchemaStep {
        version: 2,
        name: "catalog_meta",
        sql: include_str!("0002_catalog_meta.sql"),
    },
];

/// Schema version this binary writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Upgrades `conn` to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is ahead of this binary.
/// - `Sqlite` when a step fails; the file keeps its previous version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }
    if from_version == latest {
        debug!("event=db_migrate module=db status=skip version={from_version}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in SCHEMA_STEPS.iter().filter(|step| step.version > from_version) {
        apply_step(&tx, step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from_version, latest
    );
    Ok(())
}

/// True for a file that has the Northwind `Products` table but no migration
/// history, e.g. one created by another tool.
pub(crate) fn is_unversioned_catalog(conn: &Connection) -> DbResult<bool> {
    if schema_version(conn)? != 0 {
        return Ok(false);
    }
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND lower(name) = 'products';",
        [],
        |row| row.get(0),
    )?;
    Ok(tables > 0)
}

fn apply_step(tx: &Transaction<'_>, step: &SchemaStep) -> DbResult<()> {
    tx.execute_batch(step.sql)?;
    // PRAGMA does not accept bound parameters.
    tx.execute_batch(&format!("PRAGMA user_version = {};", step.version))?;
    debug!(
        "event=db_migrate_step module=db status=ok version={} name={}",
        step.version, step.name
    );
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
