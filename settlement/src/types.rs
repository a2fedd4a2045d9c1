//! Request, receipt, and wire-facing response types

use crate::Error;
use chrono::{DateTime, Utc};
use market_core::{AccountId, ItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Buyer account
    pub buyer_id: AccountId,

    /// Item to acquire
    pub item_id: ItemId,

    /// Price the client read and confirmed. Compared against the catalog
    /// with zero tolerance; a mismatch rejects the purchase.
    pub expected_price: Decimal,

    /// Client-supplied deduplication token. A retried submission with
    /// the same key returns the original receipt instead of charging
    /// twice.
    #[serde(default)]
    pub idempotency_key: Option<Uuid>,
}

impl PurchaseRequest {
    /// Create a request without an idempotency key
    pub fn new(buyer_id: AccountId, item_id: ItemId, expected_price: Decimal) -> Self {
        Self {
            buyer_id,
            item_id,
            expected_price,
            idempotency_key: None,
        }
    }

    /// Attach an idempotency key
    pub fn with_idempotency_key(mut self, key: Uuid) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Proof of a committed purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Ownership record appended by the purchase
    pub record_id: Uuid,

    /// Buyer balance after the debit
    pub new_balance: Decimal,

    /// Price actually charged
    pub price_charged: Decimal,

    /// Commit timestamp
    pub purchased_at: DateTime<Utc>,
}

/// Wire-facing response shape
///
/// `current_price` is populated only on `PRICE_CHANGED`, so the caller
/// can re-confirm and resubmit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    /// Whether the purchase committed
    pub success: bool,

    /// Receipt, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,

    /// Machine-readable failure code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Human-readable failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Current catalog price, on price mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
}

impl PurchaseOutcome {
    /// Successful outcome
    pub fn ok(receipt: Receipt) -> Self {
        Self {
            success: true,
            receipt: Some(receipt),
            error_code: None,
            error_message: None,
            current_price: None,
        }
    }

    /// Failed outcome
    pub fn failed(error: &Error) -> Self {
        Self {
            success: false,
            receipt: None,
            error_code: Some(error.error_code().to_string()),
            error_message: Some(error.to_string()),
            current_price: error.current_price(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome_omits_error_fields() {
        let receipt = Receipt {
            record_id: Uuid::now_v7(),
            new_balance: Decimal::new(6000, 2),
            price_charged: Decimal::new(4000, 2),
            purchased_at: Utc::now(),
        };
        let outcome = PurchaseOutcome::ok(receipt);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error_code").is_none());
        assert!(json.get("current_price").is_none());
        assert!(json.get("receipt").is_some());
    }

    #[test]
    fn test_price_changed_outcome_carries_current_price() {
        let err = Error::PriceChanged {
            current: Decimal::new(1500, 2),
        };
        let outcome = PurchaseOutcome::failed(&err);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_code"], "PRICE_CHANGED");
        assert_eq!(json["current_price"], "15.00");
        assert!(json.get("receipt").is_none());
    }

    #[test]
    fn test_request_builder() {
        let request = PurchaseRequest::new(
            AccountId::new("acct-1"),
            ItemId::new(2),
            Decimal::new(85, 2),
        );
        assert!(request.idempotency_key.is_none());

        let key = Uuid::new_v4();
        let request = request.with_idempotency_key(key);
        assert_eq!(request.idempotency_key, Some(key));
    }
}
