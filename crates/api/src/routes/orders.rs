//! Order lifecycle endpoints.
//!
//! Handlers are thin: they parse, call the coordinator operation, and
//! shape the response. All business rules live in the checkout crate.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use checkout::{CreateOrderInput, LineItemInput, OrderCoordinator, PaymentMethod};
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, ProductId};
use domain::{Order, OrderStatus, ShippingAddress};
use order_store::{OrderFilter, OrderStats};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub coordinator: Arc<OrderCoordinator>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    /// Explicit line items; omit to order the customer's cart.
    pub items: Option<Vec<LineItemRequest>>,
    pub shipping_address: AddressRequest,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct AddressRequest {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Deserialize)]
pub struct CompletePaymentRequest {
    pub payment_id: String,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub customer_id: String,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct ShippingUpdateRequest {
    pub status: String,
    pub tracking_number: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct StatsParams {
    pub customer_id: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub customer_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub payment_id: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

fn order_response(order: &Order) -> OrderResponse {
    let items = order
        .items
        .iter()
        .map(|item| OrderItemResponse {
            product_id: item.product_id.to_string(),
            name: item.name.clone(),
            sku: item.sku.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            line_total_cents: item.line_total.cents(),
        })
        .collect();

    OrderResponse {
        id: order.id.to_string(),
        order_number: order.order_number.clone(),
        customer_id: order.customer_id.to_string(),
        status: order.status().to_string(),
        items,
        subtotal_cents: order.totals.subtotal.cents(),
        discount_cents: order.totals.discount.cents(),
        tax_cents: order.totals.tax.cents(),
        shipping_cents: order.totals.shipping.cents(),
        total_cents: order.totals.total.cents(),
        currency: order.totals.currency.clone(),
        payment_id: order.payment_id.clone(),
        tracking_number: order.tracking_number.clone(),
        created_at: order.created_at,
    }
}

fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

fn parse_status(status: &str) -> Result<OrderStatus, ApiError> {
    status
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown order status: {status}")))
}

// -- Handlers --

/// POST /orders — run the create-order transaction.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let customer_id = parse_customer_id(&req.customer_id)?;
    let items = req.items.map(|items| {
        items
            .into_iter()
            .map(|item| LineItemInput {
                product_id: ProductId::new(item.product_id),
                quantity: item.quantity,
            })
            .collect()
    });

    let input = CreateOrderInput {
        customer_id,
        items,
        shipping_address: ShippingAddress {
            recipient: req.shipping_address.recipient,
            line1: req.shipping_address.line1,
            line2: req.shipping_address.line2,
            city: req.shipping_address.city,
            postal_code: req.shipping_address.postal_code,
            country: req.shipping_address.country,
        },
        payment_method: req.payment_method,
        coupon_code: req.coupon_code,
    };

    let order = state.coordinator.create_order(input).await?;
    Ok((axum::http::StatusCode::CREATED, Json(order_response(&order))))
}

/// GET /orders/:id — load one order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .coordinator
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(order_response(&order)))
}

/// GET /orders — list orders with optional filters.
#[tracing::instrument(skip(state, params))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let mut filter = OrderFilter::new();
    if let Some(ref customer_id) = params.customer_id {
        filter = filter.customer(parse_customer_id(customer_id)?);
    }
    if let Some(ref status) = params.status {
        filter = filter.status(parse_status(status)?);
    }
    if let Some(from) = params.created_from {
        filter = filter.created_from(from);
    }
    if let Some(to) = params.created_to {
        filter = filter.created_to(to);
    }
    if let Some(limit) = params.limit {
        filter = filter.limit(limit);
    }
    if let Some(offset) = params.offset {
        filter = filter.offset(offset);
    }

    let orders = state.coordinator.get_orders(filter).await?;
    Ok(Json(orders.iter().map(order_response).collect()))
}

/// GET /orders/stats — order statistics, optionally per customer.
#[tracing::instrument(skip(state, params))]
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Result<Json<OrderStats>, ApiError> {
    let customer_id = match params.customer_id {
        Some(ref id) => Some(parse_customer_id(id)?),
        None => None,
    };
    let stats = state.coordinator.get_order_stats(customer_id).await?;
    Ok(Json(stats))
}

/// POST /orders/:id/payment — confirm payment for an order.
#[tracing::instrument(skip(state, req))]
pub async fn complete_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CompletePaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .coordinator
        .complete_payment(order_id, &req.payment_id)
        .await?;
    Ok(Json(order_response(&order)))
}

/// POST /orders/:id/cancel — cancel an order.
#[tracing::instrument(skip(state, req))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let customer_id = parse_customer_id(&req.customer_id)?;
    let order = state
        .coordinator
        .cancel_order(order_id, customer_id, &req.reason)
        .await?;
    Ok(Json(order_response(&order)))
}

/// POST /orders/:id/shipping — advance shipping progress.
#[tracing::instrument(skip(state, req))]
pub async fn update_shipping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ShippingUpdateRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let status = parse_status(&req.status)?;
    let order = state
        .coordinator
        .update_shipping_status(order_id, status, req.tracking_number)
        .await?;
    Ok(Json(order_response(&order)))
}
