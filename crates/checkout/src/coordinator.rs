//! Order coordinator driving the create/pay/cancel/ship lifecycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{CustomerId, Money, OrderId, ProductId};
use coordination::{DocumentCache, LockStore};
use domain::{Order, OrderItem, OrderStatus, OrderTotals, PricingPolicy, ShippingAddress};
use futures_util::future::join_all;
use inventory::InventoryStore;
use order_store::{OrderFilter, OrderStats, OrderStore};

use crate::compensation::{run_compensations, OrderTransaction};
use crate::error::CheckoutError;
use crate::events::OrderLifecycleEvent;
use crate::services::{
    CartStore, CouponService, EventPublisher, PaymentGateway, PaymentMethod, Product,
    ProductCatalog,
};

/// Lock key guarding order creation for a customer.
pub fn customer_lock_key(customer_id: &CustomerId) -> String {
    format!("lock:customer:{customer_id}")
}

/// Lock key guarding lifecycle changes of one order. Distinct from the
/// per-customer creation key so a create and a cancel on different
/// orders of the same customer cannot deadlock.
pub fn order_lock_key(order_id: &OrderId) -> String {
    format!("lock:order:{order_id}")
}

/// Cache key of an assembled order document.
pub fn order_cache_key(order_id: &OrderId) -> String {
    format!("cache:order:{order_id}")
}

/// One requested line in a create-order call.
#[derive(Debug, Clone)]
pub struct LineItemInput {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Input for [`OrderCoordinator::create_order`].
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub customer_id: CustomerId,
    /// Explicit line items. `None` resolves the customer's cart instead.
    pub items: Option<Vec<LineItemInput>>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

/// Collaborators injected into the coordinator at construction.
///
/// Every dependency is a trait object so tests and local runs swap in
/// the in-memory implementations without touching the coordinator.
#[derive(Clone)]
pub struct CheckoutServices {
    pub locks: Arc<dyn LockStore>,
    pub cache: Arc<dyn DocumentCache>,
    pub orders: Arc<dyn OrderStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub publisher: Arc<dyn EventPublisher>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub carts: Arc<dyn CartStore>,
    pub coupons: Arc<dyn CouponService>,
}

/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub pricing: PricingPolicy,
    /// TTL on the per-customer and per-order locks. Bounds how long a
    /// crashed holder can block others.
    pub lock_ttl: Duration,
    /// TTL on cached order documents.
    pub cache_ttl: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            lock_ttl: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Orchestrates the full order lifecycle.
///
/// A create attempt reserves inventory per item in parallel, persists
/// the order and its items in one durable write, initiates payment and
/// publishes the creation event. Failures before success replay the
/// recorded compensations so no partial reservation survives the
/// attempt.
pub struct OrderCoordinator {
    services: CheckoutServices,
    config: CheckoutConfig,
}

impl OrderCoordinator {
    /// Creates a coordinator over the given collaborators.
    pub fn new(services: CheckoutServices, config: CheckoutConfig) -> Self {
        Self { services, config }
    }

    /// Creates an order from an explicit item list or the customer's cart.
    ///
    /// Holds the per-customer lock for the whole attempt; a concurrent
    /// attempt for the same customer fails fast with
    /// [`CheckoutError::ConcurrentOperation`] instead of queueing.
    #[tracing::instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<Order, CheckoutError> {
        metrics::counter!("order_create_attempts_total").increment(1);
        let started = Instant::now();

        let key = customer_lock_key(&input.customer_id);
        let token = self
            .services
            .locks
            .acquire(&key, self.config.lock_ttl)
            .await?
            .ok_or_else(|| CheckoutError::ConcurrentOperation { key: key.clone() })?;

        let result = self.create_order_locked(input).await;

        // Runs on success and on every error path above.
        if let Err(e) = self.services.locks.release(&key, &token).await {
            tracing::warn!(key = %key, error = %e, "failed to release customer lock");
        }

        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        if result.is_ok() {
            metrics::counter!("orders_created_total").increment(1);
        }
        result
    }

    async fn create_order_locked(&self, input: CreateOrderInput) -> Result<Order, CheckoutError> {
        let customer_id = input.customer_id;

        // 1. Resolve line items.
        let (lines, from_cart) = self.resolve_line_items(&input).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }
        for line in &lines {
            if line.quantity == 0 {
                return Err(CheckoutError::Order(domain::OrderError::InvalidQuantity {
                    product_id: line.product_id.to_string(),
                    quantity: 0,
                }));
            }
        }

        // 2. Look up products and reserve stock, one task per line.
        let mut txn = OrderTransaction::new();
        let attempts = lines.iter().map(|line| {
            let product_id = line.product_id.clone();
            let quantity = line.quantity;
            async move {
                let product = self
                    .services
                    .catalog
                    .product(&product_id)
                    .await?
                    .ok_or_else(|| CheckoutError::ProductNotFound(product_id.clone()))?;
                let granted = self.services.inventory.reserve(&product_id, quantity).await?;
                if !granted {
                    return Err(CheckoutError::InsufficientStock {
                        product_id,
                        requested: quantity,
                    });
                }
                Ok::<(Product, u32), CheckoutError>((product, quantity))
            }
        });
        let outcomes = join_all(attempts).await;

        let mut items = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                Ok((product, quantity)) => {
                    txn.record_reservation(product.id.clone(), quantity);
                    items.push(OrderItem::new(
                        product.id,
                        product.name,
                        product.sku,
                        quantity,
                        product.price,
                        product.original_price,
                    ));
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            run_compensations(self.services.inventory.as_ref(), &txn).await;
            return Err(e);
        }

        // 3. Price the order.
        let subtotal: Money = items.iter().map(|i| i.line_total).sum();
        let discount = match &input.coupon_code {
            Some(code) => match self.services.coupons.apply(code, subtotal).await {
                Ok(discount) => discount,
                Err(e) => {
                    run_compensations(self.services.inventory.as_ref(), &txn).await;
                    return Err(e);
                }
            },
            None => Money::zero(),
        };
        let tax = self.config.pricing.tax(subtotal - discount);
        let shipping = self
            .config
            .pricing
            .shipping_cost(subtotal, &input.shipping_address);
        let totals = OrderTotals::compute(
            subtotal,
            discount,
            tax,
            shipping,
            self.config.pricing.currency.clone(),
        );

        // 4. Assemble and persist the order as one durable write.
        let mut order =
            match Order::new(customer_id, items, totals, input.shipping_address.clone()) {
                Ok(order) => order,
                Err(e) => {
                    run_compensations(self.services.inventory.as_ref(), &txn).await;
                    return Err(e.into());
                }
            };
        txn.bind_order(order.id);
        if let Err(e) = order.transition(OrderStatus::Processing) {
            run_compensations(self.services.inventory.as_ref(), &txn).await;
            return Err(e.into());
        }
        if let Err(e) = self.services.orders.insert(&order).await {
            run_compensations(self.services.inventory.as_ref(), &txn).await;
            return Err(e.into());
        }

        // 5. Initiate payment. The order row already exists, so a gateway
        // failure releases the reservations and leaves the row as Failed.
        let intent = match self
            .services
            .gateway
            .process_payment(order.id, input.payment_method, customer_id)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                run_compensations(self.services.inventory.as_ref(), &txn).await;
                self.mark_failed(&mut order).await;
                return Err(CheckoutError::PaymentInitiation {
                    reason: e.to_string(),
                });
            }
        };

        // 6. Record the payment reference, durably.
        order.set_payment_id(&intent.payment_id);
        if let Err(e) = order.transition(OrderStatus::PaymentPending) {
            run_compensations(self.services.inventory.as_ref(), &txn).await;
            self.mark_failed(&mut order).await;
            return Err(e.into());
        }
        if let Err(e) = self.services.orders.update(&order).await {
            run_compensations(self.services.inventory.as_ref(), &txn).await;
            self.mark_failed(&mut order).await;
            return Err(e.into());
        }

        // 7. Side effects, all best-effort after the durable writes.
        if from_cart {
            if let Err(e) = self.services.carts.clear(customer_id).await {
                tracing::warn!(%customer_id, error = %e, "failed to clear cart after order");
            }
        }
        self.cache_order(&order).await;
        self.publish(OrderLifecycleEvent::created(&order)).await;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.totals.total,
            "order created"
        );
        Ok(order)
    }

    /// Confirms payment for an order in `PaymentPending` status.
    ///
    /// One durable write moves the order to `Paid` with the payment id;
    /// each line item's reservation is then committed as sold.
    #[tracing::instrument(skip(self))]
    pub async fn complete_payment(
        &self,
        order_id: OrderId,
        payment_id: &str,
    ) -> Result<Order, CheckoutError> {
        let mut order = self.load_order(order_id).await?;
        if order.status() != OrderStatus::PaymentPending {
            return Err(CheckoutError::InvalidState {
                action: "complete payment",
                status: order.status(),
            });
        }

        order.set_payment_id(payment_id);
        order.transition(OrderStatus::Paid)?;
        self.services.orders.update(&order).await?;

        for item in &order.items {
            self.services
                .inventory
                .confirm(&item.product_id, item.quantity)
                .await?;
        }

        self.invalidate_cache(order_id).await;
        self.publish(OrderLifecycleEvent::paid(&order)).await;
        metrics::counter!("orders_paid_total").increment(1);
        tracing::info!(order_id = %order.id, payment_id, "payment completed");
        Ok(order)
    }

    /// Cancels an order on the customer's behalf.
    ///
    /// Inventory release and the durable status change come first; the
    /// refund (for paid orders) runs last, and its failure surfaces as
    /// [`CheckoutError::RefundFailed`] without reverting the
    /// cancellation. Payment is then reconciled by an external retry
    /// process.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        reason: &str,
    ) -> Result<Order, CheckoutError> {
        let key = order_lock_key(&order_id);
        let token = self
            .services
            .locks
            .acquire(&key, self.config.lock_ttl)
            .await?
            .ok_or_else(|| CheckoutError::ConcurrentOperation { key: key.clone() })?;

        let result = self.cancel_order_locked(order_id, customer_id, reason).await;

        if let Err(e) = self.services.locks.release(&key, &token).await {
            tracing::warn!(key = %key, error = %e, "failed to release order lock");
        }
        result
    }

    async fn cancel_order_locked(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        reason: &str,
    ) -> Result<Order, CheckoutError> {
        let mut order = self.load_order(order_id).await?;
        if order.customer_id != customer_id {
            return Err(CheckoutError::OrderNotFound(order_id));
        }
        if !order.status().can_cancel() {
            return Err(CheckoutError::InvalidState {
                action: "cancel",
                status: order.status(),
            });
        }

        // Paid and Preparing orders have confirmed (sold) stock; anything
        // earlier still holds plain reservations.
        let was_paid = order.status().inventory_committed();

        // Inventory first: committed stock restocks, held stock releases.
        for item in &order.items {
            if was_paid {
                self.services
                    .inventory
                    .restock(&item.product_id, item.quantity)
                    .await?;
            } else {
                self.services
                    .inventory
                    .release(&item.product_id, item.quantity)
                    .await?;
            }
        }

        order.transition(OrderStatus::Cancelled)?;
        order.insert_metadata("cancellation_reason", reason);
        order.insert_metadata("cancelled_by", customer_id.to_string());
        self.services.orders.update(&order).await?;

        self.invalidate_cache(order_id).await;
        self.publish(OrderLifecycleEvent::cancelled(&order, reason)).await;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %order.id, reason, "order cancelled");

        if was_paid {
            if let Some(payment_id) = order.payment_id.clone() {
                if let Err(e) = self
                    .services
                    .gateway
                    .refund_payment(&payment_id, Some(order.totals.total), Some(reason))
                    .await
                {
                    metrics::counter!("refund_failures_total").increment(1);
                    tracing::error!(
                        order_id = %order.id,
                        payment_id = %payment_id,
                        error = %e,
                        "refund failed after cancellation; payment needs reconciliation"
                    );
                    return Err(CheckoutError::RefundFailed {
                        payment_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(order)
    }

    /// Advances shipping progress along `Paid → Preparing → Shipped →
    /// Delivered`, optionally attaching a tracking number.
    #[tracing::instrument(skip(self))]
    pub async fn update_shipping_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Order, CheckoutError> {
        let mut order = self.load_order(order_id).await?;

        // Only shipping-progress targets are reachable through this
        // operation; cancellation and refunds have their own paths.
        if !matches!(
            status,
            OrderStatus::Preparing | OrderStatus::Shipped | OrderStatus::Delivered
        ) {
            return Err(CheckoutError::InvalidState {
                action: "advance shipping",
                status: order.status(),
            });
        }
        order
            .transition(status)
            .map_err(|_| CheckoutError::InvalidState {
                action: "advance shipping",
                status: order.status(),
            })?;
        if let Some(tracking) = tracking_number {
            order.set_tracking_number(tracking);
        }
        self.services.orders.update(&order).await?;

        // Keep the cached document in step with the write.
        self.cache_order(&order).await;
        self.publish(OrderLifecycleEvent::shipping_updated(&order)).await;
        tracing::info!(order_id = %order.id, status = %order.status(), "shipping status updated");
        Ok(order)
    }

    /// Loads an order, serving from the cache when possible.
    ///
    /// The cache is never the system of record: any cache miss, failure
    /// or invalid document falls through to the repository, which then
    /// repopulates the cache.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, CheckoutError> {
        let key = order_cache_key(&order_id);
        match self.services.cache.get(&key).await {
            Ok(Some(doc)) => match serde_json::from_value::<Order>(doc) {
                Ok(order) => {
                    metrics::counter!("order_cache_hits_total").increment(1);
                    return Ok(Some(order));
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "cached order document invalid");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "order cache unavailable");
            }
        }

        let order = self.services.orders.find(order_id).await?;
        if let Some(ref order) = order {
            self.cache_order(order).await;
        }
        Ok(order)
    }

    /// Lists orders matching the filter, newest first.
    pub async fn get_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.services.orders.list(filter).await?)
    }

    /// Computes order statistics, optionally for one customer.
    pub async fn get_order_stats(
        &self,
        customer_id: Option<CustomerId>,
    ) -> Result<OrderStats, CheckoutError> {
        Ok(self.services.orders.stats(customer_id).await?)
    }

    async fn resolve_line_items(
        &self,
        input: &CreateOrderInput,
    ) -> Result<(Vec<LineItemInput>, bool), CheckoutError> {
        match &input.items {
            Some(items) => Ok((items.clone(), false)),
            None => {
                let cart = self.services.carts.cart(input.customer_id).await?;
                let lines = cart
                    .map(|c| {
                        c.items
                            .into_iter()
                            .map(|item| LineItemInput {
                                product_id: item.product_id,
                                quantity: item.quantity,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok((lines, true))
            }
        }
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order, CheckoutError> {
        self.services
            .orders
            .find(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))
    }

    async fn mark_failed(&self, order: &mut Order) {
        if order.transition(OrderStatus::Failed).is_ok() {
            if let Err(e) = self.services.orders.update(order).await {
                tracing::error!(order_id = %order.id, error = %e, "failed to mark order Failed");
            }
        }
    }

    async fn cache_order(&self, order: &Order) {
        let key = order_cache_key(&order.id);
        match serde_json::to_value(order) {
            Ok(doc) => {
                if let Err(e) = self
                    .services
                    .cache
                    .put(&key, doc, self.config.cache_ttl)
                    .await
                {
                    tracing::warn!(key = %key, error = %e, "failed to cache order");
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to serialize order for cache");
            }
        }
    }

    async fn invalidate_cache(&self, order_id: OrderId) {
        let key = order_cache_key(&order_id);
        if let Err(e) = self.services.cache.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "failed to invalidate cached order");
        }
    }

    async fn publish(&self, event: OrderLifecycleEvent) {
        if let Err(e) = self.services.publisher.publish(&event).await {
            tracing::warn!(
                channel = event.channel(),
                order_id = %event.order_id(),
                error = %e,
                "failed to publish order event"
            );
        }
    }
}
