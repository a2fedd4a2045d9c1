//! Settlement Engine
//!
//! The transactional core of the marketplace: exchanges credits for
//! ownership of a catalog item as a single atomic unit of work.
//!
//! # Architecture
//!
//! 1. **Validate**: buyer active, item known, confirmed price current,
//!    funds sufficient, in that order
//! 2. **Apply**: one atomic debit-and-append via the ledger store,
//!    conditioned on the balance the checks observed
//! 3. **Retry**: bounded re-run of the checks on optimistic conflict
//!
//! There is no reservation or hold state: a purchase either fully
//! commits or fully fails. Per-buyer requests are linearizable; buyers
//! never block each other.
//!
//! # Example
//!
//! ```no_run
//! use settlement::{Config, PurchaseRequest, SettlementEngine};
//! use market_core::{AccountId, ItemId};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let engine = SettlementEngine::new(Config::default()).await?;
//!
//!     let request = PurchaseRequest::new(
//!         AccountId::new("acct-1"),
//!         ItemId::new(2),
//!         Decimal::new(85, 2),
//!     );
//!     let receipt = engine.purchase(request).await?;
//!     println!("settled: record {} balance {}", receipt.record_id, receipt.new_balance);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

// Re-exports
pub use config::Config;
pub use engine::SettlementEngine;
pub use error::{Error, Result};
pub use types::{PurchaseOutcome, PurchaseRequest, Receipt};
