//! Domain error types.

use thiserror::Error;

use crate::status::OrderStatus;

/// Errors that can occur when constructing or mutating an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The state machine forbids the requested status change.
    #[error("invalid state transition: cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// An order must carry at least one line item.
    #[error("order has no items")]
    NoItems,

    /// Line item quantities must be positive.
    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// A status string from storage did not match any known status.
    #[error("unknown order status: {value}")]
    UnknownStatus { value: String },
}
