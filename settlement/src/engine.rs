//! Main settlement engine
//!
//! Orchestrates the purchase pipeline over the market stores: validate
//! the request against a consistent view of the buyer's balance, then
//! delegate the debit-and-append to the ledger's atomic primitive.

use crate::{
    config::Config,
    types::{PurchaseOutcome, PurchaseRequest, Receipt},
    Error, Result,
};
use market_core::{ApplyOutcome, CatalogStore, LedgerStore, Metrics, OwnershipRecord, Storage, TransactionLog};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

/// Settlement engine
///
/// All balance and ownership mutation funnels through `purchase`; the
/// surrounding UI only ever reads. Purchases for different buyers run
/// fully in parallel; per-buyer requests are serialized by the ledger.
pub struct SettlementEngine {
    /// Account ledger (system of record)
    ledger: Arc<LedgerStore>,

    /// Item catalog
    catalog: Arc<CatalogStore>,

    /// Purchase log read side
    log: Arc<TransactionLog>,

    /// Prometheus metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create engine, opening the market stores from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let store_config = market_core::Config {
            data_dir: config.market_data_dir.clone(),
            ..Default::default()
        };
        let storage = Arc::new(Storage::open(&store_config)?);

        Ok(Self::with_stores(
            Arc::new(LedgerStore::new(storage.clone())),
            Arc::new(CatalogStore::new(storage.clone())),
            Arc::new(TransactionLog::new(storage)),
            config,
        ))
    }

    /// Create engine over already-open stores
    pub fn with_stores(
        ledger: Arc<LedgerStore>,
        catalog: Arc<CatalogStore>,
        log: Arc<TransactionLog>,
        config: Config,
    ) -> Self {
        Self {
            ledger,
            catalog,
            log,
            metrics: Metrics::default(),
            config,
        }
    }

    /// Execute a purchase as one atomic unit of work.
    ///
    /// Checks run in order (account, item, price pinning, funds) and
    /// the commit is all-or-nothing: either the balance drops by exactly
    /// the item price and exactly one ownership record appears, or
    /// nothing changes and a typed failure is returned.
    pub async fn purchase(&self, request: PurchaseRequest) -> Result<Receipt> {
        let started = Instant::now();

        // Replayed submission: return the original receipt, charge nothing
        if let Some(key) = request.idempotency_key {
            if let Some(record) = self.ledger.find_by_idempotency_key(key)? {
                tracing::info!(buyer = %request.buyer_id, key = %key, "Replaying recorded purchase");
                return self.replay_receipt(&record);
            }
        }

        // Retry the whole check sequence on optimistic conflict; each
        // conflict means another purchase for this buyer committed first.
        for attempt in 0..=self.config.max_conflict_retries {
            match self.try_purchase(&request) {
                Ok(receipt) => {
                    self.metrics.record_purchase(started.elapsed().as_secs_f64());
                    tracing::info!(
                        buyer = %request.buyer_id,
                        item = %request.item_id,
                        record_id = %receipt.record_id,
                        new_balance = %receipt.new_balance,
                        "Purchase settled"
                    );
                    return Ok(receipt);
                }
                Err(Error::Ledger(market_core::Error::BalanceConflict { .. })) => {
                    self.metrics.record_conflict();
                    tracing::debug!(
                        buyer = %request.buyer_id,
                        attempt,
                        "Balance conflict, re-running checks"
                    );
                }
                Err(err) => {
                    self.metrics.record_failure();
                    return Err(err);
                }
            }
        }

        self.metrics.record_failure();
        tracing::warn!(buyer = %request.buyer_id, "Conflict retries exhausted");
        Err(Error::Unavailable)
    }

    /// Execute a purchase bounded by a caller-supplied deadline.
    ///
    /// On expiry the request surfaces [`Error::Timeout`] with no partial
    /// state: the atomic apply either committed before the deadline or
    /// did not run at all.
    pub async fn purchase_with_deadline(
        &self,
        request: PurchaseRequest,
        deadline: Duration,
    ) -> Result<Receipt> {
        match tokio::time::timeout(deadline, self.purchase(request)).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_failure();
                Err(Error::Timeout)
            }
        }
    }

    /// Execute a purchase and shape the result into the wire contract
    pub async fn submit(&self, request: PurchaseRequest) -> PurchaseOutcome {
        let deadline = Duration::from_millis(self.config.default_deadline_ms);
        match self.purchase_with_deadline(request, deadline).await {
            Ok(receipt) => PurchaseOutcome::ok(receipt),
            Err(err) => PurchaseOutcome::failed(&err),
        }
    }

    /// One pass of the check sequence plus the atomic apply
    fn try_purchase(&self, request: &PurchaseRequest) -> Result<Receipt> {
        // 1. Buyer exists and is active
        let account = match self.ledger.get_account(&request.buyer_id) {
            Ok(account) => account,
            Err(market_core::Error::AccountNotFound(id)) => {
                return Err(Error::AccountNotFound(id))
            }
            Err(e) => return Err(Error::Ledger(e)),
        };
        if !account.active {
            return Err(Error::AccountInactive(account.id.to_string()));
        }

        // 2. Item exists
        let item = match self.catalog.get_item(request.item_id) {
            Ok(item) => item,
            Err(market_core::Error::ItemNotFound(id)) => return Err(Error::ItemNotFound(id)),
            Err(e) => return Err(Error::Ledger(e)),
        };

        // 3. Price pinning: zero tolerance against the confirmed price.
        // Protects against the stale-price race; the cosmetic market
        // jitter shown in the UI never reaches this comparison.
        if item.price != request.expected_price {
            return Err(Error::PriceChanged {
                current: item.price,
            });
        }

        // 4. Funds cover the price
        if account.balance < item.price {
            return Err(Error::InsufficientFunds {
                balance: account.balance,
                price: item.price,
            });
        }

        // 5. Atomic debit + append, conditioned on the balance we checked
        let outcome = self
            .ledger
            .apply_purchase(
                &request.buyer_id,
                item.id,
                item.price,
                account.balance,
                request.idempotency_key,
            )
            .map_err(|e| match e {
                market_core::Error::InsufficientFunds { balance, price } => {
                    Error::InsufficientFunds { balance, price }
                }
                market_core::Error::AccountInactive(id) => Error::AccountInactive(id),
                other => Error::Ledger(other),
            })?;

        match outcome {
            ApplyOutcome::Applied(applied) => Ok(Receipt {
                record_id: applied.record.record_id,
                new_balance: applied.new_balance,
                price_charged: applied.record.price_at_purchase,
                purchased_at: applied.record.purchased_at,
            }),
            // Raced a same-key submission; the winner's record stands
            ApplyOutcome::Replayed(record) => self.replay_receipt(&record),
        }
    }

    fn replay_receipt(&self, record: &OwnershipRecord) -> Result<Receipt> {
        Ok(Receipt {
            record_id: record.record_id,
            new_balance: self.ledger.get_balance(&record.buyer)?,
            price_charged: record.price_at_purchase,
            purchased_at: record.purchased_at,
        })
    }

    /// Account ledger handle (balance reads, registration, top-up)
    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    /// Catalog handle (browse, publish, views)
    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    /// Purchase log handle (inventory, sales aggregates)
    pub fn transaction_log(&self) -> &Arc<TransactionLog> {
        &self.log
    }

    /// Metrics registry for scraping
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
