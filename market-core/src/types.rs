//! Core types for the market stores
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (Decimal for credits)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account identifier (opaque id issued at registration)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog item identifier (sequential, assigned at publish time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u64);

impl ItemId {
    /// Create from raw id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get raw id
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Big-endian key bytes (preserves id order in storage)
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item rarity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Rarity {
    /// Standard issue
    Common,
    /// Limited availability
    Rare,
    /// Top tier
    Legendary,
}

impl Rarity {
    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Common" => Some(Rarity::Common),
            "Rare" => Some(Rarity::Rare),
            "Legendary" => Some(Rarity::Legendary),
            _ => None,
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// User account with credit balance
///
/// Created at registration, never deleted, only deactivated. The balance
/// is mutated exclusively by [`crate::LedgerStore`]: debited by
/// `apply_purchase`, credited by the admin top-up operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account ID
    pub id: AccountId,

    /// Display name
    pub username: String,

    /// Credit balance (exact decimal, never negative)
    pub balance: Decimal,

    /// Admin flag
    pub is_admin: bool,

    /// Active flag (deactivated accounts cannot transact)
    pub active: bool,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

/// Purchasable catalog item
///
/// Immutable from the settlement engine's perspective; price and metadata
/// change only through the admin publishing ops. The view counter is
/// best-effort and not required to be exact under concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Item ID
    pub id: ItemId,

    /// Display name
    pub name: String,

    /// Category (e.g. "Art", "Weapon Skin", "Access")
    pub category: String,

    /// Unit price in credits
    pub price: Decimal,

    /// Rarity tier
    pub rarity: Rarity,

    /// Descriptive text
    pub description: String,

    /// Image URL
    pub image_url: String,

    /// View counter (best-effort)
    pub views: u64,

    /// Publish timestamp
    pub published_at: DateTime<Utc>,
}

/// Input for publishing a new catalog item (admin operation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDraft {
    /// Display name
    pub name: String,

    /// Category
    pub category: String,

    /// Unit price in credits
    pub price: Decimal,

    /// Rarity tier
    pub rarity: Rarity,

    /// Descriptive text
    pub description: String,

    /// Image URL
    pub image_url: String,
}

/// Immutable record of a completed purchase
///
/// Serves two logical roles with one physical write: the audit-log entry
/// and the inventory entry. A buyer's inventory is the set of records
/// where `buyer` = self. Never mutated or deleted once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipRecord {
    /// Record ID (UUIDv7 for time-ordering)
    pub record_id: Uuid,

    /// Buyer account
    pub buyer: AccountId,

    /// Item acquired
    pub item: ItemId,

    /// Price actually charged, captured at purchase time.
    /// Independent of later catalog price changes.
    pub price_at_purchase: Decimal,

    /// Purchase timestamp
    pub purchased_at: DateTime<Utc>,

    /// Client-supplied deduplication token, if any
    pub idempotency_key: Option<Uuid>,
}

/// Result of a committed `apply_purchase`
#[derive(Debug, Clone)]
pub struct PurchaseApplied {
    /// The appended ownership record
    pub record: OwnershipRecord,

    /// Buyer balance after the debit
    pub new_balance: Decimal,
}
