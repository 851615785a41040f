//! Repository for order rows and their line items
//!
//! Status and `reconciled_at` are only ever written through here, by the
//! transition service and the reconciliation engine — never as free-form
//! field updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::lifecycle::OrderStatus;

/// Closed payment classification, established at order-ingestion time.
/// The reconciliation engine never guesses from the free-form
/// `payment_method` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_kind", rename_all = "snake_case")]
pub enum PaymentKind {
    Cod,
    Prepaid,
}

/// Order row (for reading from DB)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub store_id: String,
    pub status: OrderStatus,
    pub carrier_id: Option<Uuid>,
    pub payment_method: String,
    pub payment_kind: PaymentKind,
    pub total_minor: i64,
    pub cod_expected_minor: i64,
    pub shipping_city: String,
    pub delivery_zone: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One line item of an order
#[derive(Debug, Clone, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub line_no: i32,
}

const ORDER_COLUMNS: &str = "id, store_id, status, carrier_id, payment_method, payment_kind, \
     total_minor, cod_expected_minor, shipping_city, delivery_zone, \
     delivered_at, reconciled_at, created_at";

/// Fetch an order without locking it
pub async fn find_by_id(
    pool: &PgPool,
    store_id: &str,
    order_id: Uuid,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND store_id = $2"
    ))
    .bind(order_id)
    .bind(store_id)
    .fetch_optional(pool)
    .await
}

/// Acquire an exclusive row lock on an order, failing fast on contention.
///
/// `FOR UPDATE NOWAIT`: a blocked lock here means another transaction is
/// mutating this order right now, which the caller must surface as a
/// conflict rather than wait out (SQLSTATE 55P03 bubbles up as
/// `sqlx::Error::Database`).
pub async fn lock_for_update_nowait(
    tx: &mut Transaction<'_, Postgres>,
    store_id: &str,
    order_id: Uuid,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND store_id = $2 FOR UPDATE NOWAIT"
    ))
    .bind(order_id)
    .bind(store_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Fetch an order's line items in line order
pub async fn fetch_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, quantity, line_no
        FROM order_items
        WHERE order_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await
}

/// Update an order's status; stamps `delivered_at` on first delivery.
/// Returns the updated row.
pub async fn update_status(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(&format!(
        r#"
        UPDATE orders
        SET status = $2,
            delivered_at = CASE
                WHEN $2 = 'delivered'::order_status THEN COALESCE(delivered_at, NOW())
                ELSE delivered_at
            END
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(status)
    .fetch_one(&mut **tx)
    .await
}

/// Stamp an order as reconciled, optionally finalizing its delivery.
///
/// `reconciled_at` only ever transitions null → non-null; callers must have
/// verified, under the row lock, that it is currently null and that the
/// order's status is a dispatched one.
pub async fn mark_reconciled(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    delivered: bool,
) -> Result<(), sqlx::Error> {
    if delivered {
        sqlx::query(
            r#"
            UPDATE orders
            SET reconciled_at = NOW(),
                status = 'delivered',
                delivered_at = COALESCE(delivered_at, NOW())
            WHERE id = $1 AND reconciled_at IS NULL
            "#,
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
    } else {
        // A failed attempt is still billed, but the delivery state is left
        // alone so the order can be re-dispatched.
        sqlx::query("UPDATE orders SET reconciled_at = NOW() WHERE id = $1 AND reconciled_at IS NULL")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Delete an order row (line items cascade)
pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    store_id: &str,
    order_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND store_id = $2")
        .bind(order_id)
        .bind(store_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected())
}
