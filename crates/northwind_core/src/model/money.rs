//! Fixed-point monetary values and their storage conversion rule.
//!
//! # Responsibility
//! - Represent product cost without binary floating-point error.
//! - Name the storage representation used for cost columns.
//!
//! # Invariants
//! - `Money` is an exact count of cents; parsing never rounds.
//! - Arithmetic is checked and reports overflow instead of wrapping.
//! - `CostConversion::Real` is the only lossy path and is opt-in.

use crate::model::validation::ModelValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Largest cent count that survives a round trip through `f64` exactly (2^53).
pub(crate) const MAX_EXACT_F64_CENTS: i64 = 9_007_199_254_740_992;

/// Monetary amount stored as whole cents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const ZERO: Money = Money { cents: 0 };

    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Whole-unit constructor, e.g. `Money::from_units(500)` is `$500.00`.
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(100).map(Self::from_cents)
    }

    pub const fn cents(self) -> i64 {
        self.cents
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Self::from_cents)
    }

    /// Converts a floating-point amount to cents, rounding to the nearest cent.
    ///
    /// # Errors
    /// - Non-finite input.
    /// - Magnitude beyond the range `f64` represents exactly at cent precision.
    pub fn from_f64_rounded(value: f64) -> Result<Self, ModelValidationError> {
        if !value.is_finite() {
            return Err(ModelValidationError::InvalidMoney(format!(
                "non-finite amount `{value}`"
            )));
        }

        let cents = (value * 100.0).round();
        if cents.abs() > MAX_EXACT_F64_CENTS as f64 {
            return Err(ModelValidationError::InvalidMoney(format!(
                "amount `{value}` exceeds exact floating-point range"
            )));
        }

        Ok(Self::from_cents(cents as i64))
    }

    /// Returns the amount in units as `f64`. Exact only up to 2^53 cents.
    pub fn to_f64(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl FromStr for Money {
    type Err = ModelValidationError;

    /// Parses `[-+]?[$]?digits[.d[d]]` with optional `,` digit grouping.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            ModelValidationError::InvalidMoney(format!("`{}`: {reason}", input.trim()))
        };

        let mut text = input.trim();
        let negative = match text.chars().next() {
            Some('-') => {
                text = &text[1..];
                true
            }
            Some('+') => {
                text = &text[1..];
                false
            }
            _ => false,
        };
        if let Some(rest) = text.strip_prefix('$') {
            text = rest;
        }

        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };
        if whole.contains(',') && !is_grouped_by_thousands(whole) {
            return Err(invalid("digit groups must be separated every three digits"));
        }
        let whole = whole.replace(',', "");

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("unexpected character"));
        }
        if fraction.len() > 2 {
            return Err(invalid("more than two fractional digits"));
        }

        let units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<i64>()
                .map_err(|_| invalid("amount out of range"))?
        };
        let fraction_cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => fraction.parse::<i64>().map_err(|_| invalid("bad fraction"))?,
        };

        let cents = units
            .checked_mul(100)
            .and_then(|value| value.checked_add(fraction_cents))
            .ok_or_else(|| invalid("amount out of range"))?;

        Ok(Self::from_cents(if negative { -cents } else { cents }))
    }
}

/// `1,234,567`: a leading group of one to three digits, then groups of three.
fn is_grouped_by_thousands(whole: &str) -> bool {
    let mut groups = whole.split(',');
    let leading_ok = groups
        .next()
        .is_some_and(|group| (1..=3).contains(&group.len()));
    leading_ok && groups.all(|group| group.len() == 3)
}

/// Formats as `$#,##0.00`.
impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let magnitude = self.cents.unsigned_abs();
        let units = (magnitude / 100).to_string();
        let fraction = magnitude % 100;

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (index, digit) in units.chars().enumerate() {
            if index > 0 && (units.len() - index) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        let sign = if self.cents < 0 { "-" } else { "" };
        write!(f, "{sign}${grouped}.{fraction:02}")
    }
}

/// Storage representation of cost columns, fixed per database file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostConversion {
    /// `INTEGER` cents. Lossless.
    #[default]
    Cents,
    /// `REAL` units, rounded back to the nearest cent on read.
    Real,
}

impl CostConversion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cents => "cents",
            Self::Real => "real",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cents" => Some(Self::Cents),
            "real" => Some(Self::Real),
            _ => None,
        }
    }
}

impl Display for CostConversion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
