//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Account records (key: account_id)
//! - `items` - Catalog items (key: item_id, big-endian)
//! - `ownership` - Append-only ownership records (key: record_id, UUIDv7)
//! - `indices` - Secondary indices for fast lookups
//! - `meta` - Counters and store metadata

use crate::{
    error::{Error, Result},
    types::{Account, AccountId, Item, ItemId, OwnershipRecord},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_ITEMS: &str = "items";
const CF_OWNERSHIP: &str = "ownership";
const CF_INDICES: &str = "indices";
const CF_META: &str = "meta";

/// Meta key for the item id counter
const META_NEXT_ITEM_ID: &[u8] = b"next_item_id";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for the append-heavy ownership log
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_accounts()),
            ColumnFamilyDescriptor::new(CF_ITEMS, Self::cf_options_items()),
            ColumnFamilyDescriptor::new(CF_OWNERSHIP, Self::cf_options_ownership()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ColumnFamilyDescriptor::new(CF_META, Self::cf_options_meta()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_accounts() -> Options {
        let mut opts = Options::default();
        // Hot read path, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_items() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_ownership() -> Options {
        let mut opts = Options::default();
        // Append-only, compress harder
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_meta() -> Options {
        Options::default()
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Account operations

    /// Put account record
    pub fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = bincode::serialize(account)?;
        self.db.put_cf(cf, account.id.as_str().as_bytes(), &value)?;
        Ok(())
    }

    /// Get account by ID
    pub fn get_account(&self, id: &AccountId) -> Result<Account> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let value = self
            .db
            .get_cf(cf, id.as_str().as_bytes())?
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;
        let account: Account = bincode::deserialize(&value)?;
        Ok(account)
    }

    /// True if an account record exists
    pub fn account_exists(&self, id: &AccountId) -> Result<bool> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        Ok(self.db.get_cf(cf, id.as_str().as_bytes())?.is_some())
    }

    /// List all accounts
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let cf = self.cf_handle(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            accounts.push(bincode::deserialize(&value)?);
        }
        Ok(accounts)
    }

    // Item operations

    /// Put catalog item
    pub fn put_item(&self, item: &Item) -> Result<()> {
        let cf = self.cf_handle(CF_ITEMS)?;
        let value = bincode::serialize(item)?;
        self.db.put_cf(cf, item.id.to_key(), &value)?;
        Ok(())
    }

    /// Get item by ID
    pub fn get_item(&self, id: ItemId) -> Result<Item> {
        let cf = self.cf_handle(CF_ITEMS)?;
        let value = self
            .db
            .get_cf(cf, id.to_key())?
            .ok_or(Error::ItemNotFound(id.as_u64()))?;
        let item: Item = bincode::deserialize(&value)?;
        Ok(item)
    }

    /// List all items in id order (big-endian keys sort numerically)
    pub fn list_items(&self) -> Result<Vec<Item>> {
        let cf = self.cf_handle(CF_ITEMS)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            items.push(bincode::deserialize(&value)?);
        }
        Ok(items)
    }

    /// Allocate the next item id (caller serializes via the catalog lock)
    pub fn allocate_item_id(&self) -> Result<ItemId> {
        let cf = self.cf_handle(CF_META)?;
        let next = match self.db.get_cf(cf, META_NEXT_ITEM_ID)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt item id counter".to_string()))?;
                u64::from_be_bytes(raw)
            }
            None => 1,
        };
        self.db
            .put_cf(cf, META_NEXT_ITEM_ID, (next + 1).to_be_bytes())?;
        Ok(ItemId::new(next))
    }

    // Ownership record operations

    /// Get ownership record by ID
    pub fn get_record(&self, record_id: Uuid) -> Result<OwnershipRecord> {
        let cf = self.cf_handle(CF_OWNERSHIP)?;
        let value = self
            .db
            .get_cf(cf, record_id.as_bytes())?
            .ok_or(Error::RecordNotFound(record_id))?;
        let record: OwnershipRecord = bincode::deserialize(&value)?;
        Ok(record)
    }

    /// All ownership records in append order (UUIDv7 keys sort by time)
    pub fn ownership_records(&self) -> Result<Vec<OwnershipRecord>> {
        let cf = self.cf_handle(CF_OWNERSHIP)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    /// Ownership records for one buyer, oldest first (via index)
    pub fn records_for_buyer(&self, buyer: &AccountId) -> Result<Vec<OwnershipRecord>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_prefix_buyer(buyer);

        let iter = self
            .db
            .iterator_cf(cf_indices, IteratorMode::From(&prefix, Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            // Record id is the trailing 16 bytes of the index key
            if key.len() >= prefix.len() + 16 {
                let record_id_bytes: [u8; 16] =
                    key[key.len() - 16..].try_into().expect("16-byte suffix");
                records.push(self.get_record(Uuid::from_bytes(record_id_bytes))?);
            }
        }

        Ok(records)
    }

    /// Look up a record id by idempotency key
    pub fn find_idempotency(&self, key: Uuid) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        match self.db.get_cf(cf, Self::index_key_idempotency(key))? {
            Some(bytes) => {
                let raw: [u8; 16] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Corrupt idempotency index".to_string()))?;
                Ok(Some(Uuid::from_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    // Batch operations (atomic)

    /// Commit a purchase: debited account + ownership record + indices,
    /// all-or-nothing. No partial application is visible to any reader.
    pub fn append_purchase_atomic(
        &self,
        account: &Account,
        record: &OwnershipRecord,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Debited account
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let account_value = bincode::serialize(account)?;
        batch.put_cf(cf_accounts, account.id.as_str().as_bytes(), &account_value);

        // 2. Ownership record (audit log and inventory entry in one write)
        let cf_ownership = self.cf_handle(CF_OWNERSHIP)?;
        let record_value = bincode::serialize(record)?;
        batch.put_cf(cf_ownership, record.record_id.as_bytes(), &record_value);

        // 3. Indices
        let cf_indices = self.cf_handle(CF_INDICES)?;

        // Index: buyer || record_id -> empty
        let idx_buyer = Self::index_key_buyer_record(&record.buyer, record.record_id);
        batch.put_cf(cf_indices, &idx_buyer, []);

        // Index: idempotency key -> record_id
        if let Some(key) = record.idempotency_key {
            batch.put_cf(
                cf_indices,
                Self::index_key_idempotency(key),
                record.record_id.as_bytes(),
            );
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(
            record_id = %record.record_id,
            buyer = %record.buyer,
            item = %record.item,
            "Purchase committed"
        );

        Ok(())
    }

    // Index key helpers

    fn index_prefix_buyer(buyer: &AccountId) -> Vec<u8> {
        let mut key = b"b|".to_vec();
        key.extend_from_slice(buyer.as_str().as_bytes());
        key.push(b'|');
        key
    }

    fn index_key_buyer_record(buyer: &AccountId, record_id: Uuid) -> Vec<u8> {
        let mut key = Self::index_prefix_buyer(buyer);
        key.extend_from_slice(record_id.as_bytes());
        key
    }

    fn index_key_idempotency(key: Uuid) -> Vec<u8> {
        let mut k = b"k|".to_vec();
        k.extend_from_slice(key.as_bytes());
        k
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_accounts = self.cf_handle(CF_ACCOUNTS)?;
        let cf_items = self.cf_handle(CF_ITEMS)?;
        let cf_ownership = self.cf_handle(CF_OWNERSHIP)?;

        Ok(StorageStats {
            total_accounts: self.approximate_count(cf_accounts)?,
            total_items: self.approximate_count(cf_items)?,
            total_records: self.approximate_count(cf_ownership)?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub total_accounts: u64,
    pub total_items: u64,
    pub total_records: u64,
}
