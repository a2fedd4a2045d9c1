//! Catalog store: purchasable items
//!
//! Read-mostly. Items enter the catalog through the admin publishing
//! operation and change only through admin repricing; the settlement
//! engine reads prices but never locks catalog rows. The view counter
//! is best-effort and carries no consistency guarantee.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{Item, ItemDraft, ItemId},
};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Item catalog backed by shared storage
pub struct CatalogStore {
    /// Storage backend
    storage: Arc<Storage>,

    /// Serializes item id allocation
    publish_lock: Mutex<()>,
}

impl CatalogStore {
    /// Create catalog over shared storage
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            publish_lock: Mutex::new(()),
        }
    }

    /// Publish a new item (admin operation)
    pub fn publish_item(&self, draft: ItemDraft) -> Result<Item> {
        if draft.price < Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "Item price must not be negative".to_string(),
            ));
        }

        let _guard = self.publish_lock.lock();
        let id = self.storage.allocate_item_id()?;

        let item = Item {
            id,
            name: draft.name,
            category: draft.category,
            price: draft.price,
            rarity: draft.rarity,
            description: draft.description,
            image_url: draft.image_url,
            views: 0,
            published_at: Utc::now(),
        };
        self.storage.put_item(&item)?;

        tracing::info!(item = %item.id, name = %item.name, price = %item.price, "Item published");

        Ok(item)
    }

    /// Get item by ID
    pub fn get_item(&self, id: ItemId) -> Result<Item> {
        self.storage.get_item(id)
    }

    /// Current catalog price for an item
    pub fn get_item_price(&self, id: ItemId) -> Result<Decimal> {
        Ok(self.storage.get_item(id)?.price)
    }

    /// Reprice an item (admin operation). Engine-side price pinning
    /// protects in-flight buyers from racing this.
    pub fn update_price(&self, id: ItemId, new_price: Decimal) -> Result<Item> {
        if new_price < Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "Item price must not be negative".to_string(),
            ));
        }

        let mut item = self.storage.get_item(id)?;
        let old_price = item.price;
        item.price = new_price;
        self.storage.put_item(&item)?;

        tracing::info!(item = %id, %old_price, %new_price, "Item repriced");

        Ok(item)
    }

    /// All items in id order
    pub fn list_items(&self) -> Result<Vec<Item>> {
        self.storage.list_items()
    }

    /// Bump the view counter. Best-effort: concurrent bumps may lose
    /// increments, which the counter contract permits.
    pub fn record_view(&self, id: ItemId) -> Result<u64> {
        let mut item = self.storage.get_item(id)?;
        item.views += 1;
        self.storage.put_item(&item)?;
        Ok(item.views)
    }

    /// Top N items by view count (admin projection)
    pub fn most_viewed(&self, limit: usize) -> Result<Vec<Item>> {
        let mut items = self.storage.list_items()?;
        items.sort_by(|a, b| b.views.cmp(&a.views));
        items.truncate(limit);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rarity;
    use crate::Config;
    use tempfile::TempDir;

    fn test_catalog() -> (CatalogStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let storage = Arc::new(Storage::open(&config).unwrap());
        (CatalogStore::new(storage), temp_dir)
    }

    fn draft(name: &str, price: Decimal) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            category: "Art".to_string(),
            price,
            rarity: Rarity::Common,
            description: "A glitched artifact".to_string(),
            image_url: "https://example.com/art.png".to_string(),
        }
    }

    #[test]
    fn test_publish_assigns_sequential_ids() {
        let (catalog, _temp) = test_catalog();

        let a = catalog.publish_item(draft("Cyber Skull", Decimal::new(512, 2))).unwrap();
        let b = catalog.publish_item(draft("Ghost Key", Decimal::new(85, 2))).unwrap();

        assert_eq!(a.id.as_u64(), 1);
        assert_eq!(b.id.as_u64(), 2);
        assert_eq!(a.views, 0);
    }

    #[test]
    fn test_negative_price_rejected() {
        let (catalog, _temp) = test_catalog();
        let result = catalog.publish_item(draft("Bad", Decimal::new(-1, 2)));
        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_get_item_price() {
        let (catalog, _temp) = test_catalog();
        let item = catalog.publish_item(draft("Shader", Decimal::new(15, 2))).unwrap();
        assert_eq!(catalog.get_item_price(item.id).unwrap(), Decimal::new(15, 2));

        let result = catalog.get_item_price(ItemId::new(404));
        assert!(matches!(result, Err(Error::ItemNotFound(404))));
    }

    #[test]
    fn test_update_price() {
        let (catalog, _temp) = test_catalog();
        let item = catalog.publish_item(draft("Shader", Decimal::new(10, 2))).unwrap();

        let updated = catalog.update_price(item.id, Decimal::new(15, 2)).unwrap();
        assert_eq!(updated.price, Decimal::new(15, 2));
        assert_eq!(catalog.get_item_price(item.id).unwrap(), Decimal::new(15, 2));
    }

    #[test]
    fn test_record_view_and_most_viewed() {
        let (catalog, _temp) = test_catalog();
        let a = catalog.publish_item(draft("A", Decimal::ONE)).unwrap();
        let b = catalog.publish_item(draft("B", Decimal::ONE)).unwrap();

        for _ in 0..3 {
            catalog.record_view(b.id).unwrap();
        }
        catalog.record_view(a.id).unwrap();

        let top = catalog.most_viewed(1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, b.id);
        assert_eq!(top[0].views, 3);
    }
}
