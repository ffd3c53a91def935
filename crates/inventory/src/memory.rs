//! In-memory inventory store for testing and single-node deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ProductId;

use crate::{InventoryError, InventoryStore};

#[derive(Debug, Clone, Copy, Default)]
struct StockLevel {
    available: u32,
    reserved: u32,
    sold: u32,
}

/// In-memory inventory store.
///
/// Counter moves happen under one write lock, which gives the same
/// atomicity the SQL backend gets from conditional updates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    levels: Arc<RwLock<HashMap<ProductId, StockLevel>>>,
}

impl InMemoryInventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the available stock for a product, zeroing its other counters.
    pub fn set_stock(&self, product_id: impl Into<ProductId>, available: u32) {
        self.levels.write().unwrap().insert(
            product_id.into(),
            StockLevel {
                available,
                reserved: 0,
                sold: 0,
            },
        );
    }

    /// Returns the available count for a product (0 if unknown).
    pub fn available(&self, product_id: &ProductId) -> u32 {
        self.level(product_id).available
    }

    /// Returns the reserved count for a product (0 if unknown).
    pub fn reserved(&self, product_id: &ProductId) -> u32 {
        self.level(product_id).reserved
    }

    /// Returns the sold count for a product (0 if unknown).
    pub fn sold(&self, product_id: &ProductId) -> u32 {
        self.level(product_id).sold
    }

    fn level(&self, product_id: &ProductId) -> StockLevel {
        self.levels
            .read()
            .unwrap()
            .get(product_id)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<bool, InventoryError> {
        let mut levels = self.levels.write().unwrap();
        let Some(level) = levels.get_mut(product_id) else {
            metrics::counter!("inventory_reserve_conflicts_total").increment(1);
            return Ok(false);
        };
        if level.available < quantity {
            metrics::counter!("inventory_reserve_conflicts_total").increment(1);
            return Ok(false);
        }
        level.available -= quantity;
        level.reserved += quantity;
        metrics::counter!("inventory_reservations_total").increment(1);
        Ok(true)
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError> {
        let mut levels = self.levels.write().unwrap();
        if let Some(level) = levels.get_mut(product_id) {
            let n = quantity.min(level.reserved);
            level.reserved -= n;
            level.available += n;
        }
        Ok(())
    }

    async fn confirm(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError> {
        let mut levels = self.levels.write().unwrap();
        match levels.get_mut(product_id) {
            Some(level) if level.reserved >= quantity => {
                level.reserved -= quantity;
                level.sold += quantity;
                Ok(())
            }
            level => Err(InventoryError::ReservedUnderflow {
                product_id: product_id.clone(),
                requested: quantity,
                reserved: level.map(|l| l.reserved).unwrap_or(0),
            }),
        }
    }

    async fn restock(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError> {
        let mut levels = self.levels.write().unwrap();
        if let Some(level) = levels.get_mut(product_id) {
            let n = quantity.min(level.sold);
            level.sold -= n;
            level.available += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_moves_available_to_reserved() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 10);

        assert!(inventory.reserve(&product, 3).await.unwrap());
        assert_eq!(inventory.available(&product), 7);
        assert_eq!(inventory.reserved(&product), 3);
    }

    #[tokio::test]
    async fn reserve_fails_without_side_effects_on_insufficient_stock() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 2);

        assert!(!inventory.reserve(&product, 3).await.unwrap());
        assert_eq!(inventory.available(&product), 2);
        assert_eq!(inventory.reserved(&product), 0);
    }

    #[tokio::test]
    async fn reserve_unknown_product_is_insufficient() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-404");
        assert!(!inventory.reserve(&product, 1).await.unwrap());
    }

    #[tokio::test]
    async fn release_returns_stock() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 5);

        inventory.reserve(&product, 4).await.unwrap();
        inventory.release(&product, 4).await.unwrap();

        assert_eq!(inventory.available(&product), 5);
        assert_eq!(inventory.reserved(&product), 0);
    }

    #[tokio::test]
    async fn release_clamps_to_reserved() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 5);

        inventory.reserve(&product, 2).await.unwrap();
        // Asking for more than was reserved must not mint stock.
        inventory.release(&product, 10).await.unwrap();

        assert_eq!(inventory.available(&product), 5);
        assert_eq!(inventory.reserved(&product), 0);
    }

    #[tokio::test]
    async fn confirm_moves_reserved_to_sold() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 5);

        inventory.reserve(&product, 3).await.unwrap();
        inventory.confirm(&product, 3).await.unwrap();

        assert_eq!(inventory.available(&product), 2);
        assert_eq!(inventory.reserved(&product), 0);
        assert_eq!(inventory.sold(&product), 3);
    }

    #[tokio::test]
    async fn confirm_more_than_reserved_is_an_error() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 5);

        inventory.reserve(&product, 1).await.unwrap();
        let err = inventory.confirm(&product, 2).await.unwrap_err();
        assert!(matches!(err, InventoryError::ReservedUnderflow { .. }));
    }

    #[tokio::test]
    async fn restock_returns_sold_stock() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 5);

        inventory.reserve(&product, 3).await.unwrap();
        inventory.confirm(&product, 3).await.unwrap();
        inventory.restock(&product, 3).await.unwrap();

        assert_eq!(inventory.available(&product), 5);
        assert_eq!(inventory.sold(&product), 0);
    }

    #[tokio::test]
    async fn concurrent_reserves_never_oversell() {
        let inventory = InMemoryInventory::new();
        let product = ProductId::new("PROD-001");
        inventory.set_stock(product.clone(), 5);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let inventory = inventory.clone();
            let product = product.clone();
            handles.push(tokio::spawn(async move {
                inventory.reserve(&product, 1).await.unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5);
        assert_eq!(inventory.available(&product), 0);
        assert_eq!(inventory.reserved(&product), 5);
    }
}
