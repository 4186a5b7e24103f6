//! Error types for the billing core
//!
//! Store and calculator operations report failures through `BillingError`.
//!
//! # Error Categories
//!
//! - **Expected**: unknown account numbers and rejected input. The caller
//!   shows a specific message and carries on.
//! - **Unexpected**: the database or the filesystem refused a read or write.
//!   The caller shows a generic error; nothing is silently dropped.

use thiserror::Error;

/// Main error type for the billing core
#[derive(Debug, Error)]
pub enum BillingError {
    /// No customer holds this account number
    #[error("Account number {account} not found")]
    NotFound {
        /// The account number that was looked up
        account: u32,
    },

    /// Input was rejected before anything was written
    ///
    /// Covers negative or non-numeric readings and profile updates that
    /// carry no fields.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// Every account number in the configured range is taken
    #[error("No free account numbers left in {low}..={high}")]
    IdSpaceExhausted { low: u32, high: u32 },

    /// SQLite rejected the statement
    #[error("Database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Writing an exported bill or customer listing failed
    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),

    /// Customer listing could not be written as CSV
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Bill statement could not be serialized
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl BillingError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        BillingError::InvalidInput {
            message: message.into(),
        }
    }

    /// True for conditions the caller is expected to handle with a specific
    /// message (unknown account, bad input).
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            BillingError::NotFound { .. } | BillingError::InvalidInput { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_errors() {
        assert!(BillingError::NotFound { account: 123456 }.is_expected());
        assert!(BillingError::invalid_input("negative reading").is_expected());
        assert!(!BillingError::IdSpaceExhausted { low: 1, high: 2 }.is_expected());
        assert!(!BillingError::Persistence(rusqlite::Error::InvalidQuery).is_expected());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            BillingError::NotFound { account: 654321 }.to_string(),
            "Account number 654321 not found"
        );
        assert_eq!(
            BillingError::invalid_input("Usage cannot be negative").to_string(),
            "Invalid input: Usage cannot be negative"
        );
        assert_eq!(
            BillingError::IdSpaceExhausted { low: 10, high: 12 }.to_string(),
            "No free account numbers left in 10..=12"
        );
    }
}
