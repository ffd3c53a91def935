//! Product lookup contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Product snapshot as the catalog currently sells it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    /// Price currently charged.
    pub price: Money,
    /// List price before any markdown.
    pub original_price: Money,
}

/// Read access to the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product by ID.
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, CheckoutError>;
}

/// In-memory product catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn add_product(&self, product: Product) {
        self.products
            .write()
            .unwrap()
            .insert(product.id.clone(), product);
    }

    /// Convenience helper for seeding a product without a markdown.
    pub fn add_simple(&self, id: impl Into<ProductId>, name: &str, price_cents: i64) {
        let id = id.into();
        self.add_product(Product {
            sku: format!("SKU-{id}"),
            id,
            name: name.to_string(),
            price: Money::from_cents(price_cents),
            original_price: Money::from_cents(price_cents),
        });
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, CheckoutError> {
        Ok(self.products.read().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_returns_seeded_product() {
        let catalog = InMemoryProductCatalog::new();
        catalog.add_simple("PROD-001", "Widget", 1000);

        let product = catalog
            .product(&ProductId::new("PROD-001"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.name, "Widget");
        assert_eq!(product.price.cents(), 1000);
    }

    #[tokio::test]
    async fn lookup_missing_product_is_none() {
        let catalog = InMemoryProductCatalog::new();
        let result = catalog.product(&ProductId::new("PROD-404")).await.unwrap();
        assert!(result.is_none());
    }
}
