//! Durable order repository.
//!
//! The repository persists orders and their line items, with the
//! order+items insert executing as one atomic unit. Reads cover keyed
//! lookup, filtered/paginated listing and per-customer statistics.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::StoreError;
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{validate_order_for_write, OrderFilter, OrderStats, OrderStore};
