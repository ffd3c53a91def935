//! In-memory order repository for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId};
use domain::Order;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{
    counts_toward_revenue, validate_order_for_write, OrderFilter, OrderStats, OrderStore,
};

/// In-memory order repository.
///
/// Stores whole orders in a map and provides the same interface as the
/// PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        validate_order_for_write(order)?;

        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateOrder(order.id));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        validate_order_for_write(order)?;

        let mut orders = self.orders.write().await;
        if !orders.contains_key(&order.id) {
            return Err(StoreError::OrderNotFound(order.id));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&order_id).cloned())
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset.unwrap_or(0);
        let matching: Vec<Order> = matching.into_iter().skip(offset).collect();
        let matching = match filter.limit {
            Some(limit) => matching.into_iter().take(limit).collect(),
            None => matching,
        };

        Ok(matching)
    }

    async fn stats(&self, customer_id: Option<CustomerId>) -> Result<OrderStats, StoreError> {
        let orders = self.orders.read().await;

        let mut total_orders = 0u64;
        let mut total_revenue = Money::zero();
        let mut status_counts: HashMap<String, u64> = HashMap::new();

        for order in orders.values() {
            if let Some(customer_id) = customer_id
                && order.customer_id != customer_id
            {
                continue;
            }
            total_orders += 1;
            *status_counts
                .entry(order.status().as_str().to_string())
                .or_insert(0) += 1;
            if counts_toward_revenue(order.status()) {
                total_revenue += order.totals.total;
            }
        }

        Ok(OrderStats {
            total_orders,
            total_revenue,
            status_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{OrderItem, OrderStatus, OrderTotals, ShippingAddress};

    fn address() -> ShippingAddress {
        ShippingAddress {
            recipient: "Test Customer".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn sample_order(customer_id: CustomerId, unit_price_cents: i64) -> Order {
        let item = OrderItem::new(
            "PROD-001",
            "Widget",
            "SKU-001",
            1,
            Money::from_cents(unit_price_cents),
            Money::from_cents(unit_price_cents),
        );
        let subtotal = item.line_total;
        let totals = OrderTotals::compute(
            subtotal,
            Money::zero(),
            subtotal.ratio_bps(1000),
            Money::from_cents(3000),
            "USD",
        );
        Order::new(customer_id, vec![item], totals, address()).unwrap()
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(CustomerId::new(), 1000);

        store.insert(&order).await.unwrap();
        let found = store.find(order.id).await.unwrap().unwrap();
        assert_eq!(found.id, order.id);
        assert_eq!(found.order_number, order.order_number);
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(CustomerId::new(), 1000);

        store.insert(&order).await.unwrap();
        let err = store.insert(&order).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrder(id) if id == order.id));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn inconsistent_totals_rejected() {
        let store = InMemoryOrderStore::new();
        let mut order = sample_order(CustomerId::new(), 1000);
        order.totals.total += Money::from_cents(1);

        let err = store.insert(&order).await.unwrap_err();
        assert!(matches!(err, StoreError::InconsistentTotals { .. }));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn update_existing_order() {
        let store = InMemoryOrderStore::new();
        let mut order = sample_order(CustomerId::new(), 1000);
        store.insert(&order).await.unwrap();

        order.transition(OrderStatus::Processing).unwrap();
        order.set_payment_id("PAY-001");
        store.update(&order).await.unwrap();

        let found = store.find(order.id).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Processing);
        assert_eq!(found.payment_id.as_deref(), Some("PAY-001"));
    }

    #[tokio::test]
    async fn update_missing_order_rejected() {
        let store = InMemoryOrderStore::new();
        let order = sample_order(CustomerId::new(), 1000);

        let err = store.update(&order).await.unwrap_err();
        assert!(matches!(err, StoreError::OrderNotFound(id) if id == order.id));
    }

    #[tokio::test]
    async fn find_unknown_order_is_none() {
        let store = InMemoryOrderStore::new();
        assert!(store.find(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_customer_and_status() {
        let store = InMemoryOrderStore::new();
        let alice = CustomerId::new();
        let bob = CustomerId::new();

        let a1 = sample_order(alice, 1000);
        let mut a2 = sample_order(alice, 2000);
        a2.transition(OrderStatus::Processing).unwrap();
        let b1 = sample_order(bob, 3000);

        store.insert(&a1).await.unwrap();
        store.insert(&a2).await.unwrap();
        store.insert(&b1).await.unwrap();

        let for_alice = store
            .list(OrderFilter::new().customer(alice))
            .await
            .unwrap();
        assert_eq!(for_alice.len(), 2);

        let processing = store
            .list(OrderFilter::new().customer(alice).status(OrderStatus::Processing))
            .await
            .unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].id, a2.id);
    }

    #[tokio::test]
    async fn list_pagination() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();
        for _ in 0..5 {
            store.insert(&sample_order(customer, 1000)).await.unwrap();
        }

        let page = store
            .list(OrderFilter::new().customer(customer).limit(2).offset(2))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        let tail = store
            .list(OrderFilter::new().customer(customer).offset(4))
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn stats_exclude_cancelled_revenue() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();

        let kept = sample_order(customer, 1000);
        let mut cancelled = sample_order(customer, 50_000);
        cancelled.transition(OrderStatus::Cancelled).unwrap();

        store.insert(&kept).await.unwrap();
        store.insert(&cancelled).await.unwrap();

        let stats = store.stats(Some(customer)).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.total_revenue, kept.totals.total);
        assert_eq!(stats.status_counts.get("Pending"), Some(&1));
        assert_eq!(stats.status_counts.get("Cancelled"), Some(&1));

        // Scoped to an unknown customer: empty.
        let empty = store.stats(Some(CustomerId::new())).await.unwrap();
        assert_eq!(empty.total_orders, 0);
        assert!(empty.total_revenue.is_zero());
    }
}
