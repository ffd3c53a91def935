//! Order repository error types.

use common::OrderId;
use thiserror::Error;

/// Errors that can occur in the order repository.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this ID already exists.
    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    /// The order to update does not exist.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The money breakdown does not satisfy the totals invariant.
    #[error("order {order_id} rejected: totals do not add up")]
    InconsistentTotals { order_id: OrderId },

    /// A stored row could not be mapped back to an order.
    #[error("stored order is corrupt: {0}")]
    Corrupt(String),

    /// Serialization error for the metadata column.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("order database error: {0}")]
    Database(#[from] sqlx::Error),
}
