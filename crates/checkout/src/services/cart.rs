//! Cart read/clear contract and in-memory implementation.
//!
//! The cart is only an input source here: its item-level CRUD lives
//! elsewhere. The coordinator reads it to resolve line items and clears
//! it after a successful order.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A customer's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

/// Read/clear access to customer carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the customer's cart, if any.
    async fn cart(&self, customer_id: CustomerId) -> Result<Option<Cart>, CheckoutError>;

    /// Empties the customer's cart.
    async fn clear(&self, customer_id: CustomerId) -> Result<(), CheckoutError>;
}

#[derive(Debug, Default)]
struct CartState {
    carts: HashMap<CustomerId, Cart>,
    fail_on_clear: bool,
}

/// In-memory cart store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<CartState>>,
}

impl InMemoryCartStore {
    /// Creates an empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a customer's cart.
    pub fn set_cart(&self, customer_id: CustomerId, items: Vec<CartItem>) {
        self.state
            .write()
            .unwrap()
            .carts
            .insert(customer_id, Cart { items });
    }

    /// Configures clear calls to fail, for exercising best-effort paths.
    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }

    /// Returns true if the customer currently has a non-empty cart.
    pub fn has_cart(&self, customer_id: CustomerId) -> bool {
        self.state
            .read()
            .unwrap()
            .carts
            .get(&customer_id)
            .is_some_and(|c| !c.items.is_empty())
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn cart(&self, customer_id: CustomerId) -> Result<Option<Cart>, CheckoutError> {
        Ok(self.state.read().unwrap().carts.get(&customer_id).cloned())
    }

    async fn clear(&self, customer_id: CustomerId) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_clear {
            return Err(CheckoutError::CartService("cart backend down".to_string()));
        }
        state.carts.remove(&customer_id);
        Ok(())
    }
}
