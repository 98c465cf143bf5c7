//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.
//! - Returned connections agree with the file's pinned cost conversion.
//! - Returned connections provide `catalog_fold(text)`, a Unicode lowercase
//!   used for case-insensitive matching.

use super::cost::ensure_cost_conversion;
use super::migrations::{apply_migrations, is_unversioned_catalog};
use super::DbResult;
use crate::model::money::CostConversion;
use log::{error, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Default catalog database file name, resolved against the working directory.
pub const CATALOG_DB_FILE_NAME: &str = "Northwind.db";

/// Opens (creating if needed) a SQLite database file and bootstraps it.
///
/// # Side effects
/// - Performs connection bootstrap, migration and conversion checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, conversion: CostConversion) -> DbResult<Connection> {
    open_with("file", conversion, || Connection::open(path))
}

/// Opens an in-memory SQLite database and bootstraps it.
pub fn open_db_in_memory(conversion: CostConversion) -> DbResult<Connection> {
    open_with("memory", conversion, Connection::open_in_memory)
}

fn open_with(
    mode: &str,
    conversion: CostConversion,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, conversion) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, conversion: CostConversion) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    register_functions(conn)?;

    let existing_catalog = is_unversioned_catalog(conn)?;
    if existing_catalog {
        info!("event=db_adopt module=db status=start reason=unversioned_northwind_tables");
    }
    apply_migrations(conn)?;
    ensure_cost_conversion(conn, conversion, existing_catalog)?;
    Ok(())
}

fn register_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        "catalog_fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )?;
    Ok(())
}
