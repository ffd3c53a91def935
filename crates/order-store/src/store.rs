//! Repository trait and query types.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId};
use domain::{Order, OrderStatus};
use serde::Serialize;

use crate::error::StoreError;

/// Filter for order listings. All criteria are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<CustomerId>,
    pub status: Option<OrderStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl OrderFilter {
    /// Creates an empty filter matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one customer.
    pub fn customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Restricts to one status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to orders created at or after the given instant.
    pub fn created_from(mut self, from: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self
    }

    /// Restricts to orders created at or before the given instant.
    pub fn created_to(mut self, to: DateTime<Utc>) -> Self {
        self.created_to = Some(to);
        self
    }

    /// Caps the number of returned orders.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` matching orders.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the order matches every set criterion.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(customer_id) = self.customer_id
            && order.customer_id != customer_id
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status() != status
        {
            return false;
        }
        if let Some(from) = self.created_from
            && order.created_at < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && order.created_at > to
        {
            return false;
        }
        true
    }
}

/// Aggregate order statistics, optionally scoped to one customer.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    /// Sum of order totals, excluding cancelled/refunded/failed orders.
    pub total_revenue: Money,
    /// Order count per status name.
    pub status_counts: HashMap<String, u64>,
}

/// Durable order repository.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order and its line items as one atomic write.
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// Persists the mutable fields (status, payment/tracking references,
    /// metadata) of an existing order in one durable write.
    async fn update(&self, order: &Order) -> Result<(), StoreError>;

    /// Loads an order by ID.
    async fn find(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Lists orders matching the filter, newest first.
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Computes order statistics, optionally for one customer.
    async fn stats(&self, customer_id: Option<CustomerId>) -> Result<OrderStats, StoreError>;
}

/// Validates an order before it is written.
///
/// Every implementation calls this on insert and update so the totals
/// invariant holds at persistence time regardless of backend.
pub fn validate_order_for_write(order: &Order) -> Result<(), StoreError> {
    if !order.totals.is_consistent() {
        return Err(StoreError::InconsistentTotals { order_id: order.id });
    }
    Ok(())
}

/// Returns true if an order's total counts toward revenue.
pub(crate) fn counts_toward_revenue(status: OrderStatus) -> bool {
    !matches!(
        status,
        OrderStatus::Cancelled | OrderStatus::Refunded | OrderStatus::Failed
    )
}
