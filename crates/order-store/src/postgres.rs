//! PostgreSQL-backed order repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, ProductId};
use domain::{Order, OrderItem, OrderStatus, OrderTotals, ShippingAddress};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{
    counts_toward_revenue, validate_order_for_write, OrderFilter, OrderStats, OrderStore,
};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, subtotal, discount, tax, \
     shipping, total, currency, recipient, line1, line2, city, postal_code, country, \
     payment_id, tracking_number, metadata, created_at, updated_at";

/// PostgreSQL order repository over the `orders` and `order_items` tables.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let status: OrderStatus = row
            .try_get::<String, _>("status")?
            .parse()
            .map_err(|e: domain::OrderError| StoreError::Corrupt(e.to_string()))?;
        let metadata: HashMap<String, String> =
            serde_json::from_value(row.try_get::<serde_json::Value, _>("metadata")?)?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: row.try_get("order_number")?,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            status,
            items,
            totals: OrderTotals {
                subtotal: Money::from_cents(row.try_get("subtotal")?),
                discount: Money::from_cents(row.try_get("discount")?),
                tax: Money::from_cents(row.try_get("tax")?),
                shipping: Money::from_cents(row.try_get("shipping")?),
                total: Money::from_cents(row.try_get("total")?),
                currency: row.try_get("currency")?,
            },
            shipping_address: ShippingAddress {
                recipient: row.try_get("recipient")?,
                line1: row.try_get("line1")?,
                line2: row.try_get("line2")?,
                city: row.try_get("city")?,
                postal_code: row.try_get("postal_code")?,
                country: row.try_get("country")?,
            },
            payment_id: row.try_get("payment_id")?,
            tracking_number: row.try_get("tracking_number")?,
            metadata,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem, StoreError> {
        Ok(OrderItem {
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            quantity: row.try_get::<i64, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price")?),
            original_price: Money::from_cents(row.try_get("original_price")?),
            discount: Money::from_cents(row.try_get("discount")?),
            line_total: Money::from_cents(row.try_get("line_total")?),
        })
    }

    async fn items_for(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, name, sku, quantity, unit_price, original_price,
                   discount, line_total
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = row.try_get("order_id")?;
            by_order
                .entry(order_id)
                .or_default()
                .push(Self::row_to_item(&row)?);
        }
        Ok(by_order)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        validate_order_for_write(order)?;

        let metadata_json = serde_json::to_value(&order.metadata)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO orders ({ORDER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21)
            "#,
        ))
        .bind(order.id.as_uuid())
        .bind(&order.order_number)
        .bind(order.customer_id.as_uuid())
        .bind(order.status().as_str())
        .bind(order.totals.subtotal.cents())
        .bind(order.totals.discount.cents())
        .bind(order.totals.tax.cents())
        .bind(order.totals.shipping.cents())
        .bind(order.totals.total.cents())
        .bind(&order.totals.currency)
        .bind(&order.shipping_address.recipient)
        .bind(&order.shipping_address.line1)
        .bind(&order.shipping_address.line2)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.postal_code)
        .bind(&order.shipping_address.country)
        .bind(&order.payment_id)
        .bind(&order.tracking_number)
        .bind(metadata_json)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order.id);
            }
            StoreError::Database(e)
        })?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, name, sku, quantity,
                                         unit_price, original_price, discount, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_str())
            .bind(&item.name)
            .bind(&item.sku)
            .bind(item.quantity as i64)
            .bind(item.unit_price.cents())
            .bind(item.original_price.cents())
            .bind(item.discount.cents())
            .bind(item.line_total.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        validate_order_for_write(order)?;

        let metadata_json = serde_json::to_value(&order.metadata)?;
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, payment_id = $3, tracking_number = $4, metadata = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status().as_str())
        .bind(&order.payment_id)
        .bind(&order.tracking_number)
        .bind(metadata_json)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order.id));
        }
        Ok(())
    }

    async fn find(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.items_for(&[order_id.as_uuid()]).await?;
        let items = items.remove(&order_id.as_uuid()).unwrap_or_default();
        Ok(Some(Self::row_to_order(&row, items)?))
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if filter.customer_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ${param_count}"));
        }
        if filter.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if filter.created_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC");

        if filter.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if filter.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(customer_id) = filter.customer_id {
            query = query.bind(customer_id.as_uuid());
        }
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(from) = filter.created_from {
            query = query.bind(from);
        }
        if let Some(to) = filter.created_to {
            query = query.bind(to);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }
        if let Some(offset) = filter.offset {
            query = query.bind(offset as i64);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()?;
        let mut items = self.items_for(&ids).await?;

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                Self::row_to_order(row, items.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn stats(&self, customer_id: Option<CustomerId>) -> Result<OrderStats, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS order_count, COALESCE(SUM(total), 0) AS revenue
            FROM orders
            WHERE $1::uuid IS NULL OR customer_id = $1
            GROUP BY status
            "#,
        )
        .bind(customer_id.map(|c| c.as_uuid()))
        .fetch_all(&self.pool)
        .await?;

        let mut total_orders = 0u64;
        let mut total_revenue = Money::zero();
        let mut status_counts = HashMap::new();

        for row in rows {
            let status_name: String = row.try_get("status")?;
            let status: OrderStatus = status_name
                .parse()
                .map_err(|e: domain::OrderError| StoreError::Corrupt(e.to_string()))?;
            let count: i64 = row.try_get("order_count")?;
            let revenue: i64 = row.try_get("revenue")?;

            total_orders += count as u64;
            if counts_toward_revenue(status) {
                total_revenue += Money::from_cents(revenue);
            }
            status_counts.insert(status_name, count as u64);
        }

        Ok(OrderStats {
            total_orders,
            total_revenue,
            status_counts,
        })
    }
}
