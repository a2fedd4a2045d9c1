//! Error types for the market stores

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Store errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account exists already
    #[error("Account already registered: {0}")]
    AccountExists(String),

    /// Account deactivated
    #[error("Account deactivated: {0}")]
    AccountInactive(String),

    /// Item not found
    #[error("Item not found: {0}")]
    ItemNotFound(u64),

    /// Ownership record not found
    #[error("Ownership record not found: {0}")]
    RecordNotFound(uuid::Uuid),

    /// Balance would go negative
    #[error("Insufficient funds: balance {balance}, price {price}")]
    InsufficientFunds {
        /// Current balance
        balance: Decimal,
        /// Attempted debit
        price: Decimal,
    },

    /// Balance changed between read and write (optimistic check failed)
    #[error("Balance conflict: observed {observed}, actual {actual}")]
    BalanceConflict {
        /// Balance the caller read before the atomic apply
        observed: Decimal,
        /// Balance found under the account lock
        actual: Decimal,
    },

    /// Invalid amount (negative price, non-positive credit, ...)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
