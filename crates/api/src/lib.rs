//! HTTP API server with observability for the storefront order backend.
//!
//! Provides REST endpoints over the order coordinator, with structured
//! logging (tracing) and Prometheus metrics. This layer is thin glue:
//! it calls exactly the coordinator operations and owns no business
//! rules of its own.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use checkout::{CheckoutConfig, CheckoutServices, OrderCoordinator};
use coordination::{DocumentCache, InMemoryCoordination, LockStore, RedisCoordination};
use inventory::{InMemoryInventory, InventoryStore, PostgresInventory};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders", get(routes::orders::list))
        .route("/orders/stats", get(routes::orders::stats))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/payment", post(routes::orders::complete_payment))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/shipping", post(routes::orders::update_shipping))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Handles onto the in-memory backends, for seeding demo data.
pub struct InMemoryBackends {
    pub catalog: checkout::InMemoryProductCatalog,
    pub inventory: InMemoryInventory,
    pub carts: checkout::InMemoryCartStore,
    pub coupons: checkout::InMemoryCouponService,
}

/// Creates application state per the configuration.
///
/// `DATABASE_URL` selects the PostgreSQL order repository and inventory
/// counters (migrations run on startup); `REDIS_URL` selects the Redis
/// coordination store. Either falls back to its in-memory implementation
/// when absent. The gateway, catalog, cart and coupon collaborators live
/// in other services of the platform; their in-memory stand-ins keep
/// this binary self-contained.
pub async fn create_state_from_config(
    config: &Config,
) -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
    let (orders, inventory): (Arc<dyn OrderStore>, Arc<dyn InventoryStore>) =
        match &config.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
                let orders = PostgresOrderStore::new(pool.clone());
                orders.run_migrations().await?;
                tracing::info!("using PostgreSQL order repository and inventory");
                (Arc::new(orders), Arc::new(PostgresInventory::new(pool)))
            }
            None => (
                Arc::new(InMemoryOrderStore::new()),
                Arc::new(InMemoryInventory::new()),
            ),
        };

    let (locks, cache): (Arc<dyn LockStore>, Arc<dyn DocumentCache>) = match &config.redis_url {
        Some(url) => {
            let coordination = RedisCoordination::connect(url).await?;
            tracing::info!("using Redis coordination store");
            (Arc::new(coordination.clone()), Arc::new(coordination))
        }
        None => {
            let coordination = InMemoryCoordination::new();
            (Arc::new(coordination.clone()), Arc::new(coordination))
        }
    };

    let services = CheckoutServices {
        locks,
        cache,
        orders,
        inventory,
        gateway: Arc::new(checkout::InMemoryPaymentGateway::new()),
        publisher: Arc::new(checkout::InMemoryEventPublisher::new()),
        catalog: Arc::new(checkout::InMemoryProductCatalog::new()),
        carts: Arc::new(checkout::InMemoryCartStore::new()),
        coupons: Arc::new(checkout::InMemoryCouponService::new()),
    };
    let coordinator = OrderCoordinator::new(services, CheckoutConfig::default());

    Ok(Arc::new(AppState {
        coordinator: Arc::new(coordinator),
    }))
}

/// Creates application state wired entirely to in-memory backends,
/// returning handles for seeding catalog, stock, carts and coupons.
pub fn create_default_state() -> (Arc<AppState>, InMemoryBackends) {
    let coordination = InMemoryCoordination::new();
    let orders = InMemoryOrderStore::new();
    let inventory = InMemoryInventory::new();
    let catalog = checkout::InMemoryProductCatalog::new();
    let carts = checkout::InMemoryCartStore::new();
    let coupons = checkout::InMemoryCouponService::new();

    let services = CheckoutServices {
        locks: Arc::new(coordination.clone()),
        cache: Arc::new(coordination),
        orders: Arc::new(orders),
        inventory: Arc::new(inventory.clone()),
        gateway: Arc::new(checkout::InMemoryPaymentGateway::new()),
        publisher: Arc::new(checkout::InMemoryEventPublisher::new()),
        catalog: Arc::new(catalog.clone()),
        carts: Arc::new(carts.clone()),
        coupons: Arc::new(coupons.clone()),
    };
    let coordinator = OrderCoordinator::new(services, CheckoutConfig::default());

    let state = Arc::new(AppState {
        coordinator: Arc::new(coordinator),
    });
    let backends = InMemoryBackends {
        catalog,
        inventory,
        carts,
        coupons,
    };

    (state, backends)
}
