//! Order transaction coordinator.
//!
//! This crate owns the create/pay/cancel/ship order lifecycle. A create
//! attempt reserves stock across products in parallel, persists the
//! order, initiates payment and publishes lifecycle events; any failure
//! before success unwinds every reservation made so far through recorded
//! compensation actions. Mutual exclusion across processes comes from
//! TTL-bounded locks in the coordination store, never from in-process
//! synchronization.

pub mod compensation;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod services;

pub use compensation::{CompensationAction, OrderTransaction, Reservation};
pub use coordinator::{
    CheckoutConfig, CheckoutServices, CreateOrderInput, LineItemInput, OrderCoordinator,
};
pub use error::CheckoutError;
pub use events::OrderLifecycleEvent;
pub use services::{
    Cart, CartItem, CartStore, CouponService, EventPublisher, GatewayError,
    InMemoryCartStore, InMemoryCouponService, InMemoryEventPublisher, InMemoryPaymentGateway,
    InMemoryProductCatalog, PaymentGateway, PaymentIntent, PaymentMethod, Product,
    ProductCatalog, PublishError, Refund,
};
