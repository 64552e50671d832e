use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{
    models::{Courier, CourierStatus, CourierUpdate, NewCourier},
    traits::CourierRepository,
    DispatchError, DispatchResult,
};
use sqlx::{PgPool, Row};
use tracing::debug;

pub(crate) const COURIER_COLUMNS: &str =
    "id, name, phone, status, transport_type, created_at, updated_at";

/// Least-loaded available courier. Load is the number of active deliveries
/// the courier holds; completed and expired rows do not count.
pub(crate) const SELECT_LEAST_LOADED: &str = r#"
    SELECT c.id, c.name, c.phone, c.status, c.transport_type, c.created_at, c.updated_at
    FROM couriers c
    WHERE c.status = 'available'
    ORDER BY (
        SELECT COUNT(*) FROM delivery d
        WHERE d.courier_id = c.id AND d.completed_at IS NULL AND d.expired_at IS NULL
    ) ASC, c.id ASC
    LIMIT 1
"#;

pub(crate) fn row_to_courier(row: &sqlx::postgres::PgRow) -> DispatchResult<Courier> {
    Ok(Courier {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        status: row.try_get("status")?,
        transport_type: row.try_get("transport_type")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map a unique violation on `couriers.phone` to `Conflict`.
fn map_phone_conflict(err: sqlx::Error, phone: &str) -> DispatchError {
    let is_unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if is_unique {
        DispatchError::Conflict(format!("courier with phone {phone} already exists"))
    } else {
        DispatchError::Database(err)
    }
}

/// PostgreSQL courier directory
pub struct PostgresCourierRepository {
    pool: PgPool,
}

impl PostgresCourierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourierRepository for PostgresCourierRepository {
    async fn create(&self, courier: &NewCourier) -> DispatchResult<Courier> {
        let row = sqlx::query(&format!(
            "INSERT INTO couriers (name, phone, status, transport_type) \
             VALUES ($1, $2, $3, $4) RETURNING {COURIER_COLUMNS}"
        ))
        .bind(&courier.name)
        .bind(&courier.phone)
        .bind(CourierStatus::Available)
        .bind(&courier.transport_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_phone_conflict(e, &courier.phone))?;

        let created = row_to_courier(&row)?;
        debug!(courier_id = created.id, "courier created");
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> DispatchResult<Option<Courier>> {
        let row = sqlx::query(&format!(
            "SELECT {COURIER_COLUMNS} FROM couriers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_courier).transpose()
    }

    async fn list(&self) -> DispatchResult<Vec<Courier>> {
        let rows = sqlx::query(&format!(
            "SELECT {COURIER_COLUMNS} FROM couriers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_courier).collect()
    }

    async fn update(&self, update: &CourierUpdate) -> DispatchResult<Courier> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE couriers SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                transport_type = COALESCE($4, transport_type),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COURIER_COLUMNS}
            "#
        ))
        .bind(update.id)
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.transport_type.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_phone_conflict(e, update.phone.as_deref().unwrap_or_default()))?;

        match row {
            Some(row) => {
                debug!(courier_id = update.id, "courier updated");
                row_to_courier(&row)
            }
            None => Err(DispatchError::CourierNotFound { id: update.id }),
        }
    }

    async fn find_available(&self) -> DispatchResult<Option<Courier>> {
        let row = sqlx::query(SELECT_LEAST_LOADED)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_courier).transpose()
    }

    async fn set_status(&self, id: i64, status: CourierStatus) -> DispatchResult<()> {
        let result =
            sqlx::query("UPDATE couriers SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DispatchError::CourierNotFound { id });
        }
        Ok(())
    }

    async fn release_expired(&self, now: DateTime<Utc>) -> DispatchResult<u64> {
        // One statement: both tables change together or not at all.
        let result = sqlx::query(
            r#"
            WITH expired AS (
                UPDATE delivery SET expired_at = $1
                WHERE completed_at IS NULL AND expired_at IS NULL AND deadline < $1
                RETURNING courier_id
            )
            UPDATE couriers c SET status = 'available', updated_at = $1
            WHERE c.status = 'busy' AND c.id IN (SELECT courier_id FROM expired)
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
