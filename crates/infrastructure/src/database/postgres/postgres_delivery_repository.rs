use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{
    models::{Courier, CourierStatus, Delivery, NewDelivery},
    traits::{DeliveryRepository, DeliveryTransaction},
    DispatchError, DispatchResult,
};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use super::postgres_courier_repository::{row_to_courier, COURIER_COLUMNS, SELECT_LEAST_LOADED};

const DELIVERY_COLUMNS: &str =
    "id, courier_id, order_id, assigned_at, deadline, completed_at, expired_at";

const ACTIVE: &str = "completed_at IS NULL AND expired_at IS NULL";

fn row_to_delivery(row: &sqlx::postgres::PgRow) -> DispatchResult<Delivery> {
    Ok(Delivery {
        id: row.try_get("id")?,
        courier_id: row.try_get("courier_id")?,
        order_id: row.try_get("order_id")?,
        assigned_at: row.try_get("assigned_at")?,
        deadline: row.try_get("deadline")?,
        completed_at: row.try_get("completed_at")?,
        expired_at: row.try_get("expired_at")?,
    })
}

/// PostgreSQL delivery ledger
pub struct PostgresDeliveryRepository {
    pool: PgPool,
}

impl PostgresDeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryRepository for PostgresDeliveryRepository {
    async fn begin(&self) -> DispatchResult<Box<dyn DeliveryTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresDeliveryTransaction { tx }))
    }

    async fn get_by_order(&self, order_id: &str) -> DispatchResult<Option<Delivery>> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM delivery WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_delivery).transpose()
    }

    async fn list_active(&self) -> DispatchResult<Vec<Delivery>> {
        let rows = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM delivery WHERE {ACTIVE} ORDER BY deadline"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_delivery).collect()
    }
}

/// Unit of work over one database transaction. Dropping it rolls back.
pub struct PostgresDeliveryTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DeliveryTransaction for PostgresDeliveryTransaction {
    async fn lock_available_courier(&mut self) -> DispatchResult<Option<Courier>> {
        // SKIP LOCKED: a courier reserved by another open transaction is
        // never offered twice.
        let row = sqlx::query(&format!("{SELECT_LEAST_LOADED} FOR UPDATE OF c SKIP LOCKED"))
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_courier).transpose()
    }

    async fn set_courier_status(&mut self, id: i64, status: CourierStatus) -> DispatchResult<()> {
        let result =
            sqlx::query("UPDATE couriers SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::CourierNotFound { id });
        }
        Ok(())
    }

    async fn get_courier(&mut self, id: i64) -> DispatchResult<Option<Courier>> {
        let row = sqlx::query(&format!(
            "SELECT {COURIER_COLUMNS} FROM couriers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_courier).transpose()
    }

    async fn create(&mut self, delivery: &NewDelivery) -> DispatchResult<Delivery> {
        let row = sqlx::query(&format!(
            "INSERT INTO delivery (courier_id, order_id, assigned_at, deadline) \
             VALUES ($1, $2, $3, $4) RETURNING {DELIVERY_COLUMNS}"
        ))
        .bind(delivery.courier_id)
        .bind(&delivery.order_id)
        .bind(delivery.assigned_at)
        .bind(delivery.deadline)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            let is_unique = e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false);
            if is_unique {
                DispatchError::Conflict(format!(
                    "delivery for order {} already exists",
                    delivery.order_id
                ))
            } else {
                DispatchError::Database(e)
            }
        })?;

        let created = row_to_delivery(&row)?;
        debug!(order_id = %created.order_id, courier_id = created.courier_id, "delivery created");
        Ok(created)
    }

    async fn get_by_order(&mut self, order_id: &str) -> DispatchResult<Option<Delivery>> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM delivery WHERE order_id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_delivery).transpose()
    }

    async fn delete_by_order(&mut self, order_id: &str) -> DispatchResult<Delivery> {
        let row = sqlx::query(&format!(
            "DELETE FROM delivery WHERE order_id = $1 AND {ACTIVE} RETURNING {DELIVERY_COLUMNS}"
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => row_to_delivery(&row),
            None => Err(DispatchError::delivery_not_found(order_id)),
        }
    }

    async fn mark_completed(
        &mut self,
        order_id: &str,
        at: DateTime<Utc>,
    ) -> DispatchResult<Delivery> {
        let row = sqlx::query(&format!(
            "UPDATE delivery SET completed_at = $2 WHERE order_id = $1 AND {ACTIVE} \
             RETURNING {DELIVERY_COLUMNS}"
        ))
        .bind(order_id)
        .bind(at)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => row_to_delivery(&row),
            None => Err(DispatchError::delivery_not_found(order_id)),
        }
    }

    async fn commit(self: Box<Self>) -> DispatchResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
