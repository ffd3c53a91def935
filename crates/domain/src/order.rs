//! Order record and line-item snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::status::OrderStatus;

/// A line item captured at order time.
///
/// This is a snapshot of the product as sold, not a live reference, so
/// historical orders are unaffected by later catalog changes. Items are
/// created with the order and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product identifier.
    pub product_id: ProductId,

    /// Product name at order time.
    pub name: String,

    /// Stock keeping unit at order time.
    pub sku: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit actually charged.
    pub unit_price: Money,

    /// List price per unit before any product-level markdown.
    pub original_price: Money,

    /// Markdown across the line: `(original_price - unit_price) * quantity`.
    pub discount: Money,

    /// Line total: `unit_price * quantity`.
    pub line_total: Money,
}

impl OrderItem {
    /// Creates a line-item snapshot, deriving discount and line total.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        sku: impl Into<String>,
        quantity: u32,
        unit_price: Money,
        original_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            sku: sku.into(),
            quantity,
            unit_price,
            original_price,
            discount: (original_price - unit_price).multiply(quantity),
            line_total: unit_price.multiply(quantity),
        }
    }
}

/// Money breakdown for an order.
///
/// Invariant: `subtotal - discount + tax + shipping == total`. Use
/// [`OrderTotals::compute`] so the invariant holds by construction;
/// storage backends re-check it with [`OrderTotals::is_consistent`]
/// before accepting a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    /// ISO 4217 currency code for every amount in this breakdown.
    pub currency: String,
}

impl OrderTotals {
    /// Computes a consistent breakdown from its components.
    pub fn compute(
        subtotal: Money,
        discount: Money,
        tax: Money,
        shipping: Money,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            subtotal,
            discount,
            tax,
            shipping,
            total: subtotal - discount + tax + shipping,
            currency: currency.into(),
        }
    }

    /// Returns true if the breakdown satisfies the totals invariant.
    pub fn is_consistent(&self) -> bool {
        self.subtotal - self.discount + self.tax + self.shipping == self.total
    }
}

/// Shipping destination captured at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// A customer order.
///
/// Line items and totals are immutable after creation; only the status,
/// payment reference, tracking number and metadata mutate, and status
/// moves exclusively through [`Order::transition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable order number, e.g. `ORD-20260805-1A2B3C4D`.
    pub order_number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping_address: ShippingAddress,
    /// Reference assigned by the payment gateway once payment is initiated.
    pub payment_id: Option<String>,
    /// Carrier tracking number once the order ships.
    pub tracking_number: Option<String>,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `Pending` status.
    ///
    /// Rejects empty item lists and zero quantities; both should already
    /// have been screened by the caller.
    pub fn new(
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        totals: OrderTotals,
        shipping_address: ShippingAddress,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.to_string(),
                    quantity: 0,
                });
            }
        }

        let id = OrderId::new();
        let created_at = Utc::now();
        Ok(Self {
            id,
            order_number: order_number(id, created_at),
            customer_id,
            status: OrderStatus::Pending,
            items,
            totals,
            shipping_address,
            payment_id: None,
            tracking_number: None,
            metadata: HashMap::new(),
            created_at,
            updated_at: created_at,
        })
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Moves the order to `next`, validating against the state machine.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        self.status.check_transition(next)?;
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the payment gateway reference.
    pub fn set_payment_id(&mut self, payment_id: impl Into<String>) {
        self.payment_id = Some(payment_id.into());
        self.updated_at = Utc::now();
    }

    /// Records the carrier tracking number.
    pub fn set_tracking_number(&mut self, tracking: impl Into<String>) {
        self.tracking_number = Some(tracking.into());
        self.updated_at = Utc::now();
    }

    /// Attaches a metadata entry.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
        self.updated_at = Utc::now();
    }

    /// Total quantity across all line items.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

fn order_number(id: OrderId, created_at: DateTime<Utc>) -> String {
    let short = id.as_uuid().simple().to_string();
    format!(
        "ORD-{}-{}",
        created_at.format("%Y%m%d"),
        short[..8].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            recipient: "Jan Kowalski".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn widget_item(quantity: u32) -> OrderItem {
        OrderItem::new(
            "PROD-001",
            "Widget",
            "SKU-001",
            quantity,
            Money::from_cents(1000),
            Money::from_cents(1200),
        )
    }

    fn totals_for(items: &[OrderItem]) -> OrderTotals {
        let subtotal: Money = items.iter().map(|i| i.line_total).sum();
        OrderTotals::compute(
            subtotal,
            Money::zero(),
            subtotal.ratio_bps(1000),
            Money::from_cents(3000),
            "USD",
        )
    }

    #[test]
    fn item_snapshot_derives_discount_and_line_total() {
        let item = widget_item(3);
        assert_eq!(item.line_total.cents(), 3000);
        assert_eq!(item.discount.cents(), 600);
    }

    #[test]
    fn totals_invariant_holds_by_construction() {
        let totals = OrderTotals::compute(
            Money::from_cents(10_000),
            Money::from_cents(500),
            Money::from_cents(950),
            Money::from_cents(3000),
            "USD",
        );
        assert_eq!(totals.total.cents(), 13_450);
        assert!(totals.is_consistent());
    }

    #[test]
    fn tampered_totals_detected() {
        let mut totals = totals_for(&[widget_item(1)]);
        totals.total += Money::from_cents(1);
        assert!(!totals.is_consistent());
    }

    #[test]
    fn new_order_starts_pending_with_order_number() {
        let items = vec![widget_item(2)];
        let totals = totals_for(&items);
        let order = Order::new(CustomerId::new(), items, totals, address()).unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.order_number.len(), "ORD-20260805-1A2B3C4D".len());
        assert!(order.payment_id.is_none());
        assert_eq!(order.total_quantity(), 2);
    }

    #[test]
    fn empty_order_rejected() {
        let totals = OrderTotals::compute(
            Money::zero(),
            Money::zero(),
            Money::zero(),
            Money::zero(),
            "USD",
        );
        let result = Order::new(CustomerId::new(), vec![], totals, address());
        assert!(matches!(result, Err(OrderError::NoItems)));
    }

    #[test]
    fn zero_quantity_rejected() {
        let items = vec![widget_item(0)];
        let totals = totals_for(&items);
        let result = Order::new(CustomerId::new(), items, totals, address());
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }

    #[test]
    fn transition_moves_along_the_graph() {
        let items = vec![widget_item(1)];
        let totals = totals_for(&items);
        let mut order = Order::new(CustomerId::new(), items, totals, address()).unwrap();

        order.transition(OrderStatus::Processing).unwrap();
        order.transition(OrderStatus::PaymentPending).unwrap();
        order.transition(OrderStatus::Paid).unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);

        let err = order.transition(OrderStatus::PaymentPending).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[test]
    fn serialization_roundtrip() {
        let items = vec![widget_item(2)];
        let totals = totals_for(&items);
        let order = Order::new(CustomerId::new(), items, totals, address()).unwrap();

        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
