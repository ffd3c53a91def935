//! Checkout error types.

use common::{OrderId, ProductId};
use coordination::CoordinationError;
use domain::{OrderError, OrderStatus};
use inventory::InventoryError;
use order_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the order coordinator.
///
/// Every variant maps to a stable error kind with a human-readable
/// reason; storage and gateway payloads are wrapped, never passed
/// through verbatim to callers.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Another operation holds the lock for this customer or order.
    /// Retryable by the caller with backoff.
    #[error("another operation is in progress for {key}; retry shortly")]
    ConcurrentOperation { key: String },

    /// No line items resolved from the request or the customer's cart.
    #[error("order has no items")]
    EmptyOrder,

    /// A requested product does not exist in the catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Stock reservation was refused for a product.
    #[error("insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ProductId, requested: u32 },

    /// The payment gateway refused or failed to initiate payment.
    #[error("payment initiation failed: {reason}")]
    PaymentInitiation { reason: String },

    /// The order is not in a status that permits the operation.
    #[error("cannot {action}: order status is {status}")]
    InvalidState {
        action: &'static str,
        status: OrderStatus,
    },

    /// The refund call failed after a cancellation already completed.
    /// The cancellation stands; payment must be reconciled separately.
    #[error("refund for payment {payment_id} failed: {reason}")]
    RefundFailed { payment_id: String, reason: String },

    /// No order exists with the given ID (or it belongs to a different
    /// customer).
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The coupon code was rejected.
    #[error("coupon rejected: {reason}")]
    CouponRejected { reason: String },

    /// Product catalog error.
    #[error("catalog service error: {0}")]
    CatalogService(String),

    /// Cart service error.
    #[error("cart service error: {0}")]
    CartService(String),

    /// Order model error.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Inventory service error.
    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Order repository error.
    #[error("order store error: {0}")]
    Store(#[from] StoreError),

    /// Coordination store error.
    #[error("coordination error: {0}")]
    Coordination(#[from] CoordinationError),
}

impl CheckoutError {
    /// Returns true if the caller should simply retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::ConcurrentOperation { .. })
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
