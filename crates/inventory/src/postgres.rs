//! PostgreSQL-backed inventory store.
//!
//! Atomicity comes from single conditional `UPDATE` statements: the
//! stock check and the counter moves execute in one statement, so two
//! orders racing on the same product serialize on the row lock and the
//! loser observes the already-decremented value.

use async_trait::async_trait;
use common::ProductId;
use sqlx::PgPool;

use crate::{InventoryError, InventoryStore};

/// PostgreSQL inventory store over the `inventory` table.
#[derive(Clone)]
pub struct PostgresInventory {
    pool: PgPool,
}

impl PostgresInventory {
    /// Creates a new PostgreSQL inventory store.
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

    /// Creates or replaces the stock record for a product.
    pub async fn set_stock(
        &self,
        product_id: &ProductId,
        available: u32,
    ) -> Result<(), InventoryError> {
        sqlx::query(
            r#"
            INSERT INTO inventory (product_id, available, reserved, sold)
            VALUES ($1, $2, 0, 0)
            ON CONFLICT (product_id) DO UPDATE SET
                available = EXCLUDED.available,
                reserved = 0,
                sold = 0
            "#,
        )
        .bind(product_id.as_str())
        .bind(available as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PostgresInventory {
    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<bool, InventoryError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET available = available - $2, reserved = reserved + $2
            WHERE product_id = $1 AND available >= $2
            "#,
        )
        .bind(product_id.as_str())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;

        let granted = result.rows_affected() == 1;
        if granted {
            metrics::counter!("inventory_reservations_total").increment(1);
        } else {
            metrics::counter!("inventory_reserve_conflicts_total").increment(1);
        }
        Ok(granted)
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError> {
        // Both assignments read the pre-update reserved value, so the
        // clamp and the two moves stay consistent within one statement.
        sqlx::query(
            r#"
            UPDATE inventory
            SET available = available + LEAST(reserved, $2),
                reserved = reserved - LEAST(reserved, $2)
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_str())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn confirm(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory
            SET reserved = reserved - $2, sold = sold + $2
            WHERE product_id = $1 AND reserved >= $2
            "#,
        )
        .bind(product_id.as_str())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let reserved: Option<i64> =
                sqlx::query_scalar("SELECT reserved FROM inventory WHERE product_id = $1")
                    .bind(product_id.as_str())
                    .fetch_optional(&self.pool)
                    .await?;
            return Err(InventoryError::ReservedUnderflow {
                product_id: product_id.clone(),
                requested: quantity,
                reserved: reserved.unwrap_or(0).max(0) as u32,
            });
        }
        Ok(())
    }

    async fn restock(&self, product_id: &ProductId, quantity: u32) -> Result<(), InventoryError> {
        sqlx::query(
            r#"
            UPDATE inventory
            SET available = available + LEAST(sold, $2),
                sold = sold - LEAST(sold, $2)
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_str())
        .bind(quantity as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
