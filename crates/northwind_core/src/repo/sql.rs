//! Shared SQL helpers for catalog repositories.

use crate::repo::error::{CatalogError, CatalogResult};
use log::{error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::time::Instant;

/// Runs `sql` with `LIMIT ?` appended and decodes every row.
///
/// Callers resume each page after the last key they saw (`WHERE key > ?`).
pub(crate) fn query_page<T>(
    conn: &Connection,
    sql: &str,
    bind_values: &[Value],
    limit: u32,
    decode: impl FnMut(&Row<'_>) -> CatalogResult<T>,
) -> CatalogResult<Vec<T>> {
    let paged_sql = format!("{sql} LIMIT ?");
    let mut values = bind_values.to_vec();
    values.push(Value::Integer(i64::from(limit)));
    query_all(conn, &paged_sql, &values, decode)
}

/// Runs `sql` and decodes every row.
pub(crate) fn query_all<T>(
    conn: &Connection,
    sql: &str,
    bind_values: &[Value],
    mut decode: impl FnMut(&Row<'_>) -> CatalogResult<T>,
) -> CatalogResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
    let mut items = Vec::new();

    while let Some(row) = rows.next()? {
        items.push(decode(row)?);
    }

    Ok(items)
}

/// `?, ?, ?` for an `IN (...)` list of `count` keys.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Escapes `LIKE` wildcards for use with `ESCAPE '\'`.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_flag(value: i64, column: &str) -> CatalogResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CatalogError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

/// Emits one `event=<op>` line for a finished mutation.
pub(crate) fn log_mutation<T>(
    op: &str,
    session_id: u64,
    started_at: Instant,
    result: &CatalogResult<T>,
) {
    match result {
        Ok(_) => info!(
            "event={} module=repo status=ok session_id={} duration_ms={}",
            op,
            session_id,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={} module=repo status=error session_id={} duration_ms={} error_code={} error={}",
            op,
            session_id,
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }
}
