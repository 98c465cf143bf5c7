//! Cost column encoding per `CostConversion`.
//!
//! # Invariants
//! - A file's conversion is pinned on first open and never changes.
//! - A pre-existing Northwind file (tables present before the first
//!   migration) holds `UnitPrice` as decimal units and is pinned to `Real`.

use crate::db::{DbError, DbResult};
use crate::model::money::{CostConversion, Money, MAX_EXACT_F64_CENTS};
use log::info;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};

const COST_CONVERSION_KEY: &str = "cost_conversion";

/// Encodes a cost for binding into SQL.
pub(crate) fn cost_to_sql(conversion: CostConversion, money: Money) -> Value {
    match conversion {
        CostConversion::Cents => Value::Integer(money.cents()),
        CostConversion::Real => Value::Real(money.to_f64()),
    }
}

/// Decodes a stored cost. `Ok(None)` for SQL `NULL`.
pub(crate) fn cost_from_sql(
    conversion: CostConversion,
    value: ValueRef<'_>,
) -> Result<Option<Money>, String> {
    match (conversion, value) {
        (_, ValueRef::Null) => Ok(None),
        (CostConversion::Cents, ValueRef::Integer(cents)) => Ok(Some(Money::from_cents(cents))),
        (CostConversion::Cents, ValueRef::Real(cents)) => {
            if !cents.is_finite() || cents.fract() != 0.0 {
                return Err(format!("fractional cent value `{cents}` in Products.UnitPrice"));
            }
            if cents.abs() > MAX_EXACT_F64_CENTS as f64 {
                return Err(format!("cent value `{cents}` out of range in Products.UnitPrice"));
            }
            Ok(Some(Money::from_cents(cents as i64)))
        }
        (CostConversion::Real, ValueRef::Integer(units)) => Money::from_units(units)
            .map(Some)
            .ok_or_else(|| format!("cost `{units}` out of range in Products.UnitPrice")),
        (CostConversion::Real, ValueRef::Real(units)) => Money::from_f64_rounded(units)
            .map(Some)
            .map_err(|err| format!("{err} in Products.UnitPrice")),
        (_, other) => Err(format!(
            "unexpected {:?} value in Products.UnitPrice",
            other.data_type()
        )),
    }
}

/// Records the conversion on first open and rejects a different one later.
///
/// `existing_catalog` marks a file whose tables predate the first migration;
/// its stored prices are decimal units, so it is pinned to `Real`.
pub(crate) fn ensure_cost_conversion(
    conn: &Connection,
    conversion: CostConversion,
    existing_catalog: bool,
) -> DbResult<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM catalog_meta WHERE key = ?1;",
            [COST_CONVERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    let stored = match stored {
        Some(stored) => stored,
        None => {
            let pinned = if existing_catalog {
                CostConversion::Real
            } else {
                conversion
            };
            conn.execute(
                "INSERT INTO catalog_meta (key, value) VALUES (?1, ?2);",
                params![COST_CONVERSION_KEY, pinned.as_str()],
            )?;
            info!(
                "event=cost_conversion_pinned module=db status=ok conversion={} existing_catalog={}",
                pinned, existing_catalog
            );
            pinned.as_str().to_string()
        }
    };

    if stored == conversion.as_str() {
        Ok(())
    } else {
        Err(DbError::CostConversionMismatch {
            stored,
            configured: conversion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{cost_from_sql, cost_to_sql};
    use crate::model::money::{CostConversion, Money};
    use rusqlite::types::{Value, ValueRef};

    #[test]
    fn cents_are_stored_as_integers() {
        let value = cost_to_sql(CostConversion::Cents, Money::from_cents(999));
        assert_eq!(value, Value::Integer(999));
        let decoded = cost_from_sql(CostConversion::Cents, ValueRef::from(&value)).unwrap();
        assert_eq!(decoded, Some(Money::from_cents(999)));
    }

    #[test]
    fn real_storage_rounds_back_to_cents() {
        let value = cost_to_sql(CostConversion::Real, Money::from_cents(999));
        assert_eq!(value, Value::Real(9.99));
        let decoded = cost_from_sql(CostConversion::Real, ValueRef::from(&value)).unwrap();
        assert_eq!(decoded, Some(Money::from_cents(999)));

        // NUMERIC affinity turns whole REAL values into INTEGER.
        let whole = cost_from_sql(CostConversion::Real, ValueRef::Integer(500)).unwrap();
        assert_eq!(whole, Some(Money::from_cents(50_000)));
    }

    #[test]
    fn null_and_bad_values() {
        assert_eq!(
            cost_from_sql(CostConversion::Cents, ValueRef::Null).unwrap(),
            None
        );
        assert!(cost_from_sql(CostConversion::Cents, ValueRef::Real(9.5)).is_err());
        assert!(cost_from_sql(CostConversion::Real, ValueRef::Text(b"cheap")).is_err());
    }

    #[test]
    fn huge_whole_real_cents_are_rejected_instead_of_saturating() {
        let err = cost_from_sql(CostConversion::Cents, ValueRef::Real(1e300)).unwrap_err();
        assert!(err.contains("out of range"), "{err}");
        assert!(cost_from_sql(CostConversion::Cents, ValueRef::Real(f64::INFINITY)).is_err());
        assert_eq!(
            cost_from_sql(CostConversion::Cents, ValueRef::Real(1_250.0)).unwrap(),
            Some(Money::from_cents(1_250))
        );
    }
}
