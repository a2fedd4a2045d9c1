//! Transaction log: read-side queries over ownership records
//!
//! The log is the append-only stream of completed purchases written by
//! the ledger's atomic commit. Queries here run against short-lived
//! RocksDB read snapshots and never block writers.

use crate::{
    error::Result,
    storage::Storage,
    types::{AccountId, ItemId, OwnershipRecord},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Sales totals for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSales {
    /// Item sold
    pub item: ItemId,

    /// Units sold
    pub units: u64,

    /// Gross revenue (sum of captured purchase prices)
    pub gross: Decimal,
}

/// Count and sum over a time window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSummary {
    /// Purchases in the window
    pub count: u64,

    /// Gross revenue in the window
    pub gross: Decimal,
}

/// Read-side view over the purchase log
pub struct TransactionLog {
    /// Storage backend
    storage: Arc<Storage>,
}

impl TransactionLog {
    /// Create log view over shared storage
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// A buyer's ownership records, newest first (the inventory view)
    pub fn records_for_buyer(&self, buyer: &AccountId) -> Result<Vec<OwnershipRecord>> {
        // Index scan yields append order; inventory shows newest first
        let mut records = self.storage.records_for_buyer(buyer)?;
        records.reverse();
        Ok(records)
    }

    /// Total historical spend for a buyer, recoverable from the records
    /// alone, independent of current catalog prices.
    pub fn total_spend(&self, buyer: &AccountId) -> Result<Decimal> {
        let records = self.storage.records_for_buyer(buyer)?;
        Ok(records.iter().map(|r| r.price_at_purchase).sum())
    }

    /// Units and gross revenue grouped by item, best sellers first
    pub fn sales_by_item(&self) -> Result<Vec<ItemSales>> {
        let mut by_item: BTreeMap<ItemId, (u64, Decimal)> = BTreeMap::new();
        for record in self.storage.ownership_records()? {
            let entry = by_item.entry(record.item).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += record.price_at_purchase;
        }

        let mut sales: Vec<ItemSales> = by_item
            .into_iter()
            .map(|(item, (units, gross))| ItemSales { item, units, gross })
            .collect();
        sales.sort_by(|a, b| b.units.cmp(&a.units));
        Ok(sales)
    }

    /// Count and sum of purchases inside `[from, to)`
    pub fn sales_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SalesSummary> {
        let mut count = 0u64;
        let mut gross = Decimal::ZERO;
        for record in self.storage.ownership_records()? {
            if record.purchased_at >= from && record.purchased_at < to {
                count += 1;
                gross += record.price_at_purchase;
            }
        }
        Ok(SalesSummary { count, gross })
    }

    /// Overall totals (admin dashboard header)
    pub fn stats(&self) -> Result<SalesSummary> {
        let mut count = 0u64;
        let mut gross = Decimal::ZERO;
        for record in self.storage.ownership_records()? {
            count += 1;
            gross += record.price_at_purchase;
        }
        Ok(SalesSummary { count, gross })
    }
}
