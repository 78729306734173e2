//! Error types for the bucket ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A delivery or seed quantity was below zero
    #[error("Quantities cannot be negative ({field} = {value})")]
    NegativeQuantity {
        /// Offending input field
        field: &'static str,
        /// Value that was supplied
        value: i64,
    },

    /// Applying the delivery would drive the balance below zero
    #[error("Not enough empty buckets: only {available} on hand")]
    InsufficientEmptyBuckets {
        /// Empties actually available for collection
        available: i64,
    },

    /// Arithmetic on the quantities left the representable range
    #[error("Quantity out of range")]
    QuantityOverflow,

    /// Underlying key-value store call failed
    #[error("Store unavailable: {0}")]
    Store(String),

    /// Stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No free record key could be found near the creation instant
    #[error("Could not allocate a unique record key near {0}")]
    KeyCollision(String),
}

impl LedgerError {
    /// True for errors caused by caller input rather than the store
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::NegativeQuantity { .. }
                | LedgerError::InsufficientEmptyBuckets { .. }
                | LedgerError::QuantityOverflow
        )
    }
}
