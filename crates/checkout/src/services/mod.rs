//! Collaborator contracts consumed by the coordinator, with in-memory
//! implementations for tests and local runs.

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod gateway;
pub mod publisher;

pub use cart::{Cart, CartItem, CartStore, InMemoryCartStore};
pub use catalog::{InMemoryProductCatalog, Product, ProductCatalog};
pub use coupon::{CouponService, InMemoryCouponService};
pub use gateway::{
    GatewayError, InMemoryPaymentGateway, PaymentGateway, PaymentIntent, PaymentMethod, Refund,
};
pub use publisher::{EventPublisher, InMemoryEventPublisher, PublishError};
