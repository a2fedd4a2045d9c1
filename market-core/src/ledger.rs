//! Ledger store: accounts, balances, and the atomic purchase primitive
//!
//! The ledger is the system of record for credit balances and item
//! ownership. All balance mutation funnels through two operations:
//! `apply_purchase` (the settlement debit) and `credit_account` (the
//! admin top-up path). Per-account updates are linearizable: a lock
//! stripe per account serializes the read-check-write sequence, and the
//! actual commit is a single RocksDB `WriteBatch`. Accounts never block
//! each other.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{Account, AccountId, ItemId, OwnershipRecord, PurchaseApplied},
};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of `apply_purchase`
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// A new ownership record was committed
    Applied(PurchaseApplied),

    /// The idempotency key was already recorded; nothing was committed
    Replayed(OwnershipRecord),
}

/// Account ledger backed by shared storage
pub struct LedgerStore {
    /// Storage backend
    storage: Arc<Storage>,

    /// Per-account lock stripes (purchases for different buyers never contend)
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl LedgerStore {
    /// Create ledger over shared storage
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
        }
    }

    /// Register a new account
    ///
    /// Accounts are created once, at identity registration, and are never
    /// deleted afterwards, only deactivated.
    pub fn create_account(
        &self,
        id: AccountId,
        username: impl Into<String>,
        opening_balance: Decimal,
        is_admin: bool,
    ) -> Result<Account> {
        if opening_balance < Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "Opening balance must not be negative".to_string(),
            ));
        }
        if self.storage.account_exists(&id)? {
            return Err(Error::AccountExists(id.to_string()));
        }

        let account = Account {
            id,
            username: username.into(),
            balance: opening_balance,
            is_admin,
            active: true,
            created_at: Utc::now(),
        };
        self.storage.put_account(&account)?;

        tracing::info!(account = %account.id, balance = %account.balance, "Account registered");

        Ok(account)
    }

    /// Get account by ID
    pub fn get_account(&self, id: &AccountId) -> Result<Account> {
        self.storage.get_account(id)
    }

    /// Current balance for an account
    pub fn get_balance(&self, id: &AccountId) -> Result<Decimal> {
        Ok(self.storage.get_account(id)?.balance)
    }

    /// Credit an account (admin/top-up path, the only non-settlement
    /// balance mutation)
    pub fn credit_account(&self, id: &AccountId, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "Credit amount must be positive".to_string(),
            ));
        }

        let lock = self.account_lock(id);
        let _guard = lock.lock();

        let mut account = self.storage.get_account(id)?;
        if !account.active {
            return Err(Error::AccountInactive(id.to_string()));
        }

        account.balance += amount;
        self.storage.put_account(&account)?;

        tracing::info!(account = %id, amount = %amount, balance = %account.balance, "Account credited");

        Ok(account.balance)
    }

    /// Deactivate an account (accounts are never deleted)
    pub fn deactivate_account(&self, id: &AccountId) -> Result<()> {
        let lock = self.account_lock(id);
        let _guard = lock.lock();

        let mut account = self.storage.get_account(id)?;
        account.active = false;
        self.storage.put_account(&account)?;

        tracing::info!(account = %id, "Account deactivated");

        Ok(())
    }

    /// All accounts, richest first (admin projection)
    pub fn list_accounts_by_balance(&self) -> Result<Vec<Account>> {
        let mut accounts = self.storage.list_accounts()?;
        accounts.sort_by(|a, b| b.balance.cmp(&a.balance));
        Ok(accounts)
    }

    /// Atomically debit the buyer and append an ownership record.
    ///
    /// This is the first-class atomic primitive the settlement engine
    /// depends on. Under the buyer's lock the balance is re-read and
    /// compared against `observed_balance`; a mismatch fails with
    /// [`Error::BalanceConflict`] so the caller can re-run its check
    /// sequence. On success the debit, the ownership record, and its
    /// indices commit in one `WriteBatch`, all-or-nothing.
    ///
    /// Holds only the buyer's stripe for the duration; purchases by other
    /// accounts proceed in parallel.
    pub fn apply_purchase(
        &self,
        buyer: &AccountId,
        item: ItemId,
        price: Decimal,
        observed_balance: Decimal,
        idempotency_key: Option<Uuid>,
    ) -> Result<ApplyOutcome> {
        if price < Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "Price must not be negative".to_string(),
            ));
        }

        let lock = self.account_lock(buyer);
        let _guard = lock.lock();

        // Replay check must happen under the lock: two racing submissions
        // with the same key serialize here, and the loser sees the
        // winner's record instead of double-charging.
        if let Some(key) = idempotency_key {
            if let Some(record_id) = self.storage.find_idempotency(key)? {
                let record = self.storage.get_record(record_id)?;
                tracing::info!(buyer = %buyer, key = %key, "Purchase replayed via idempotency key");
                return Ok(ApplyOutcome::Replayed(record));
            }
        }

        let mut account = self.storage.get_account(buyer)?;
        if !account.active {
            return Err(Error::AccountInactive(buyer.to_string()));
        }

        if account.balance != observed_balance {
            return Err(Error::BalanceConflict {
                observed: observed_balance,
                actual: account.balance,
            });
        }

        if account.balance < price {
            return Err(Error::InsufficientFunds {
                balance: account.balance,
                price,
            });
        }

        account.balance -= price;

        let record = OwnershipRecord {
            record_id: Uuid::now_v7(),
            buyer: buyer.clone(),
            item,
            price_at_purchase: price,
            purchased_at: Utc::now(),
            idempotency_key,
        };

        self.storage.append_purchase_atomic(&account, &record)?;

        tracing::info!(
            buyer = %buyer,
            item = %item,
            price = %price,
            balance = %account.balance,
            "Purchase applied"
        );

        Ok(ApplyOutcome::Applied(PurchaseApplied {
            record,
            new_balance: account.balance,
        }))
    }

    /// Look up an ownership record by idempotency key
    pub fn find_by_idempotency_key(&self, key: Uuid) -> Result<Option<OwnershipRecord>> {
        match self.storage.find_idempotency(key)? {
            Some(record_id) => Ok(Some(self.storage.get_record(record_id)?)),
            None => Ok(None),
        }
    }

    fn account_lock(&self, id: &AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use tempfile::TempDir;

    fn test_ledger() -> (LedgerStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let storage = Arc::new(Storage::open(&config).unwrap());
        (LedgerStore::new(storage), temp_dir)
    }

    fn dec(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

    #[test]
    fn test_create_and_get_account() {
        let (ledger, _temp) = test_ledger();

        let account = ledger
            .create_account(AccountId::new("acct-1"), "netrunner", dec(10000, 2), false)
            .unwrap();
        assert_eq!(account.balance, dec(10000, 2));
        assert!(account.active);

        let retrieved = ledger.get_account(&account.id).unwrap();
        assert_eq!(retrieved.username, "netrunner");
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let (ledger, _temp) = test_ledger();
        let id = AccountId::new("acct-1");

        ledger
            .create_account(id.clone(), "first", Decimal::ZERO, false)
            .unwrap();
        let result = ledger.create_account(id, "second", Decimal::ZERO, false);
        assert!(matches!(result, Err(Error::AccountExists(_))));
    }

    #[test]
    fn test_credit_account() {
        let (ledger, _temp) = test_ledger();
        let id = AccountId::new("acct-1");
        ledger
            .create_account(id.clone(), "netrunner", dec(500, 2), false)
            .unwrap();

        let balance = ledger.credit_account(&id, dec(250, 2)).unwrap();
        assert_eq!(balance, dec(750, 2));

        let result = ledger.credit_account(&id, Decimal::ZERO);
        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_deactivated_account_rejects_mutation() {
        let (ledger, _temp) = test_ledger();
        let id = AccountId::new("acct-1");
        ledger
            .create_account(id.clone(), "netrunner", dec(10000, 2), false)
            .unwrap();
        ledger.deactivate_account(&id).unwrap();

        let result = ledger.credit_account(&id, dec(100, 2));
        assert!(matches!(result, Err(Error::AccountInactive(_))));

        let result = ledger.apply_purchase(&id, ItemId::new(1), dec(100, 2), dec(10000, 2), None);
        assert!(matches!(result, Err(Error::AccountInactive(_))));
    }

    #[test]
    fn test_apply_purchase_debits_and_records() {
        let (ledger, _temp) = test_ledger();
        let id = AccountId::new("acct-1");
        ledger
            .create_account(id.clone(), "netrunner", dec(10000, 2), false)
            .unwrap();

        let outcome = ledger
            .apply_purchase(&id, ItemId::new(1), dec(4000, 2), dec(10000, 2), None)
            .unwrap();

        match outcome {
            ApplyOutcome::Applied(applied) => {
                assert_eq!(applied.new_balance, dec(6000, 2));
                assert_eq!(applied.record.price_at_purchase, dec(4000, 2));
                assert_eq!(applied.record.buyer, id);
            }
            ApplyOutcome::Replayed(_) => panic!("Expected fresh purchase"),
        }

        assert_eq!(ledger.get_balance(&id).unwrap(), dec(6000, 2));
    }

    #[test]
    fn test_apply_purchase_balance_conflict() {
        let (ledger, _temp) = test_ledger();
        let id = AccountId::new("acct-1");
        ledger
            .create_account(id.clone(), "netrunner", dec(10000, 2), false)
            .unwrap();

        // Caller read a stale balance
        let result = ledger.apply_purchase(&id, ItemId::new(1), dec(4000, 2), dec(9999, 2), None);
        assert!(matches!(result, Err(Error::BalanceConflict { .. })));

        // Nothing was committed
        assert_eq!(ledger.get_balance(&id).unwrap(), dec(10000, 2));
        assert!(ledger
            .find_by_idempotency_key(Uuid::new_v4())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_apply_purchase_insufficient_funds() {
        let (ledger, _temp) = test_ledger();
        let id = AccountId::new("acct-1");
        ledger
            .create_account(id.clone(), "netrunner", dec(1000, 2), false)
            .unwrap();

        let result = ledger.apply_purchase(&id, ItemId::new(1), dec(4000, 2), dec(1000, 2), None);
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(ledger.get_balance(&id).unwrap(), dec(1000, 2));
    }

    #[test]
    fn test_apply_purchase_idempotent_replay() {
        let (ledger, _temp) = test_ledger();
        let id = AccountId::new("acct-1");
        ledger
            .create_account(id.clone(), "netrunner", dec(10000, 2), false)
            .unwrap();

        let key = Uuid::new_v4();
        let first = ledger
            .apply_purchase(&id, ItemId::new(1), dec(4000, 2), dec(10000, 2), Some(key))
            .unwrap();
        let first_record = match first {
            ApplyOutcome::Applied(applied) => applied.record,
            ApplyOutcome::Replayed(_) => panic!("Expected fresh purchase"),
        };

        // Retried submission with the same key: no second debit
        let second = ledger
            .apply_purchase(&id, ItemId::new(1), dec(4000, 2), dec(6000, 2), Some(key))
            .unwrap();
        match second {
            ApplyOutcome::Replayed(record) => assert_eq!(record.record_id, first_record.record_id),
            ApplyOutcome::Applied(_) => panic!("Expected replay"),
        }

        assert_eq!(ledger.get_balance(&id).unwrap(), dec(6000, 2));
    }

    #[test]
    fn test_concurrent_purchases_serialize_per_account() {
        let (ledger, _temp) = test_ledger();
        let ledger = Arc::new(ledger);
        let id = AccountId::new("acct-1");
        ledger
            .create_account(id.clone(), "netrunner", dec(6000, 2), false)
            .unwrap();

        // Two racing purchases of 40.00 against a 60.00 balance: at most
        // one can commit, whichever loses sees a conflict or short funds.
        let mut handles = Vec::new();
        for _ in 0..2 {
            let ledger = ledger.clone();
            let id = id.clone();
            handles.push(std::thread::spawn(move || {
                let observed = ledger.get_balance(&id).unwrap();
                ledger.apply_purchase(&id, ItemId::new(1), dec(4000, 2), observed, None)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        assert_eq!(ledger.get_balance(&id).unwrap(), dec(2000, 2));
    }
}
