//! Grid-specific error types

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in grid trading operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Invalid grid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid price range: lower {lower} must be below upper {upper}")]
    InvalidRange { lower: Decimal, upper: Decimal },

    #[error("Infeasible allocation: {0}")]
    InfeasibleAllocation(String),

    #[error("Infeasible allocation: two grid levels resolve to price {0}")]
    DuplicateLevelPrice(Decimal),

    #[error("No grid quantity available near price {0}")]
    PriceNotFound(Decimal),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl GridError {
    /// Whether this error must stop the strategy before any order is placed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GridError::InvalidConfig(_)
                | GridError::InvalidRange { .. }
                | GridError::InfeasibleAllocation(_)
                | GridError::DuplicateLevelPrice(_)
                | GridError::Settings(_)
        )
    }
}

impl From<::config::ConfigError> for GridError {
    fn from(err: ::config::ConfigError) -> Self {
        GridError::Settings(err.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::JsonParse(err.to_string())
    }
}

impl From<std::io::Error> for GridError {
    fn from(err: std::io::Error) -> Self {
        GridError::Io(err.to_string())
    }
}

/// Result type for grid operations
pub type GridResult<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fatal_classification() {
        assert!(GridError::InvalidConfig("tick".into()).is_fatal());
        assert!(GridError::InvalidRange {
            lower: dec!(2),
            upper: dec!(1)
        }
        .is_fatal());
        assert!(GridError::DuplicateLevelPrice(dec!(100)).is_fatal());
        assert!(!GridError::PriceNotFound(dec!(100)).is_fatal());
        assert!(!GridError::Gateway("down".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = GridError::InvalidRange {
            lower: dec!(50000),
            upper: dec!(40000),
        };
        assert_eq!(
            err.to_string(),
            "Invalid price range: lower 50000 must be below upper 40000"
        );
    }
}
