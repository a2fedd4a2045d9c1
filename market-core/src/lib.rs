//! NEXUS Market Core
//!
//! Durable stores for the marketplace: the account ledger (system of
//! record for credit balances and item ownership), the item catalog,
//! and the append-only transaction log.
//!
//! # Architecture
//!
//! - **Single atomic primitive**: `apply_purchase` commits debit and
//!   ownership record in one `WriteBatch`
//! - **Per-account linearizability**: a lock stripe per account, no
//!   cross-account blocking
//! - **Append-only log**: ownership records never modified or deleted
//!
//! # Invariants
//!
//! - Balance never negative
//! - `balance_before - balance_after == price_at_purchase` per record
//! - Record count only grows; historical spend recoverable from records

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use catalog::CatalogStore;
pub use config::Config;
pub use error::{Error, Result};
pub use history::{ItemSales, SalesSummary, TransactionLog};
pub use ledger::{ApplyOutcome, LedgerStore};
pub use metrics::Metrics;
pub use storage::Storage;
pub use types::{
    Account, AccountId, Item, ItemDraft, ItemId, OwnershipRecord, PurchaseApplied, Rarity,
};
