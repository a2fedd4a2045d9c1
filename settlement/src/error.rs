//! Error types for the settlement engine
//!
//! Every failure is a typed result. A caller always receives either a
//! definite receipt or a definite, explained rejection, never an
//! ambiguous outcome.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Purchase failures
#[derive(Error, Debug)]
pub enum Error {
    /// Buyer account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Buyer account is deactivated
    #[error("Account deactivated: {0}")]
    AccountInactive(String),

    /// Item does not exist in the catalog
    #[error("Item not found: {0}")]
    ItemNotFound(u64),

    /// Catalog price differs from the price the client confirmed.
    /// Recoverable: the caller may re-confirm at `current` and retry.
    #[error("Price changed: current price is {current}")]
    PriceChanged {
        /// Current catalog price
        current: Decimal,
    },

    /// Balance does not cover the price. Terminal for this attempt.
    #[error("Insufficient funds: balance {balance}, price {price}")]
    InsufficientFunds {
        /// Buyer balance at check time
        balance: Decimal,
        /// Item price
        price: Decimal,
    },

    /// Conflict retries exhausted; the caller may try again later
    #[error("Settlement unavailable: conflict retries exhausted")]
    Unavailable,

    /// Caller-supplied deadline expired. No partial state was left
    /// behind: the atomic apply either committed before the deadline or
    /// did not run.
    #[error("Purchase deadline exceeded")]
    Timeout,

    /// Ledger/storage failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] market_core::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Stable machine-readable code for the wire contract
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Error::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Error::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Error::PriceChanged { .. } => "PRICE_CHANGED",
            Error::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Error::Unavailable => "UNAVAILABLE",
            Error::Timeout => "TIMEOUT",
            Error::Ledger(_) => "LEDGER_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// The current catalog price, populated only for `PriceChanged`
    pub fn current_price(&self) -> Option<Decimal> {
        match self {
            Error::PriceChanged { current } => Some(*current),
            _ => None,
        }
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
