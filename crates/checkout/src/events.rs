//! Order lifecycle events broadcast over the event bus.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId};
use domain::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// A lifecycle transition published after the corresponding durable
/// write succeeds. Delivery is fire-and-forget: subscribers (notification,
/// analytics) get no ordering or delivery guarantee from the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderLifecycleEvent {
    OrderCreated {
        order_id: OrderId,
        order_number: String,
        customer_id: CustomerId,
        total: Money,
        currency: String,
        occurred_at: DateTime<Utc>,
    },
    OrderPaid {
        order_id: OrderId,
        payment_id: String,
        occurred_at: DateTime<Utc>,
    },
    OrderCancelled {
        order_id: OrderId,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    OrderShippingUpdated {
        order_id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
        occurred_at: DateTime<Utc>,
    },
}

impl OrderLifecycleEvent {
    /// Builds the creation event from a freshly persisted order.
    pub fn created(order: &Order) -> Self {
        Self::OrderCreated {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            total: order.totals.total,
            currency: order.totals.currency.clone(),
            occurred_at: Utc::now(),
        }
    }

    /// Builds the payment-confirmed event.
    pub fn paid(order: &Order) -> Self {
        Self::OrderPaid {
            order_id: order.id,
            payment_id: order.payment_id.clone().unwrap_or_default(),
            occurred_at: Utc::now(),
        }
    }

    /// Builds the cancellation event.
    pub fn cancelled(order: &Order, reason: &str) -> Self {
        Self::OrderCancelled {
            order_id: order.id,
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        }
    }

    /// Builds the shipping-progress event.
    pub fn shipping_updated(order: &Order) -> Self {
        Self::OrderShippingUpdated {
            order_id: order.id,
            status: order.status(),
            tracking_number: order.tracking_number.clone(),
            occurred_at: Utc::now(),
        }
    }

    /// The bus channel this event is published on.
    pub fn channel(&self) -> &'static str {
        match self {
            OrderLifecycleEvent::OrderCreated { .. } => "orders.created",
            OrderLifecycleEvent::OrderPaid { .. } => "orders.paid",
            OrderLifecycleEvent::OrderCancelled { .. } => "orders.cancelled",
            OrderLifecycleEvent::OrderShippingUpdated { .. } => "orders.shipping",
        }
    }

    /// The order this event concerns.
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderLifecycleEvent::OrderCreated { order_id, .. }
            | OrderLifecycleEvent::OrderPaid { order_id, .. }
            | OrderLifecycleEvent::OrderCancelled { order_id, .. }
            | OrderLifecycleEvent::OrderShippingUpdated { order_id, .. } => *order_id,
        }
    }
}
