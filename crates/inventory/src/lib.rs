//! Stock reservation service.
//!
//! Every product carries three counters: `available`, `reserved` and
//! `sold`. A reservation conditionally moves stock from available to
//! reserved in one atomic step; it is later either confirmed (moved to
//! sold, irreversible) or released back. All operations are safe under
//! arbitrary interleaving from concurrent orders on the same product.

mod memory;
mod postgres;

use async_trait::async_trait;
use common::ProductId;
use thiserror::Error;

pub use memory::InMemoryInventory;
pub use postgres::PostgresInventory;

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Confirm was asked to commit more stock than is reserved.
    #[error("cannot confirm {requested} units of {product_id}: only {reserved} reserved")]
    ReservedUnderflow {
        product_id: ProductId,
        requested: u32,
        reserved: u32,
    },

    /// Database error from the backing store.
    #[error("inventory database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Per-product stock counters.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Atomically moves `quantity` units from available to reserved.
    ///
    /// Returns `Ok(false)` without any side effect when fewer than
    /// `quantity` units are available (including when the product has no
    /// stock record at all). The check and the decrement happen in one
    /// atomic step; there is no read-then-write race.
    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<bool, InventoryError>;

    /// Moves up to `quantity` units from reserved back to available.
    ///
    /// Safe to call with amounts not exceeding what was reserved; excess
    /// is clamped, so a release never underflows the reserved counter.
    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError>;

    /// Moves `quantity` units from reserved to sold. Irreversible through
    /// this operation; a later cancellation restores sold stock with
    /// [`InventoryStore::restock`].
    async fn confirm(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError>;

    /// Moves up to `quantity` units from sold back to available, used
    /// when a paid order is cancelled after its reservations were
    /// confirmed. Excess is clamped like [`InventoryStore::release`].
    async fn restock(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError>;
}
