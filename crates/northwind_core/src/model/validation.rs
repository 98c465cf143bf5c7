//! Declaration-level validation for catalog entities.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures raised before any write reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Required name is empty or whitespace only.
    EmptyName { entity: &'static str },
    /// Name exceeds the declared column width.
    NameTooLong {
        entity: &'static str,
        max: usize,
        actual: usize,
    },
    /// Stock quantity below zero.
    NegativeStock(i64),
    /// Monetary text or arithmetic cannot be represented exactly in cents.
    InvalidMoney(String),
    /// Lookup term is empty where a non-empty term is required.
    EmptySearchTerm,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName { entity } => write!(f, "{entity} name must not be empty"),
            Self::NameTooLong {
                entity,
                max,
                actual,
            } => write!(
                f,
                "{entity} name is {actual} characters long; maximum is {max}"
            ),
            Self::NegativeStock(value) => write!(f, "stock must not be negative, got {value}"),
            Self::InvalidMoney(message) => write!(f, "invalid money value: {message}"),
            Self::EmptySearchTerm => write!(f, "search term must not be empty"),
        }
    }
}

impl Error for ModelValidationError {}

/// Checks a required name against a maximum width in characters.
pub(crate) fn validate_name(
    entity: &'static str,
    name: &str,
    max_chars: usize,
) -> Result<(), ModelValidationError> {
    if name.trim().is_empty() {
        return Err(ModelValidationError::EmptyName { entity });
    }

    let actual = name.chars().count();
    if actual > max_chars {
        return Err(ModelValidationError::NameTooLong {
            entity,
            max: max_chars,
            actual,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_name, ModelValidationError};

    #[test]
    fn counts_characters_not_bytes() {
        // 15 characters, 30 bytes.
        let name = "ééééééééééééééé";
        assert!(validate_name("category", name, 15).is_ok());
    }

    #[test]
    fn rejects_whitespace_only_names() {
        let err = validate_name("product", "   ", 40).unwrap_err();
        assert_eq!(err, ModelValidationError::EmptyName { entity: "product" });
    }

    #[test]
    fn reports_actual_length_when_too_long() {
        let err = validate_name("category", "Confections and more", 15).unwrap_err();
        assert_eq!(
            err,
            ModelValidationError::NameTooLong {
                entity: "category",
                max: 15,
                actual: 20,
            }
        );
        assert!(err.to_string().contains("maximum is 15"));
    }
}
