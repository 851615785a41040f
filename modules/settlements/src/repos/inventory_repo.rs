//! Repository for product stock and the inventory movement ledger
//!
//! `inventory_movements` is append-only: replaying `quantity_delta` in
//! `created_at` order from initial stock must always reproduce current
//! stock. Rows are never updated or deleted.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

/// Semantic of a stock movement, recorded by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "movement_type", rename_all = "snake_case")]
pub enum MovementType {
    OrderReady,
    OrderCancelled,
    OrderReverted,
    ReturnAccepted,
    ReturnRejected,
}

/// Product stock row, read under lock
#[derive(Debug, Clone, FromRow)]
pub struct ProductStock {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
}

/// Struct for appending a movement row
#[derive(Debug, Clone)]
pub struct MovementInsert {
    pub product_id: Uuid,
    pub order_id: Uuid,
    pub quantity_delta: i32,
    pub stock_before: i32,
    pub stock_after: i32,
    pub movement_type: MovementType,
}

/// Acquire an exclusive lock on a product's stock row before reading it.
///
/// `FOR UPDATE NOWAIT` so two orders racing on the same product surface a
/// conflict instead of silently losing an update. Returns None when the
/// product no longer exists in the catalog.
pub async fn lock_stock_nowait(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> Result<Option<ProductStock>, sqlx::Error> {
    sqlx::query_as::<_, ProductStock>(
        "SELECT id, name, stock FROM products WHERE id = $1 FOR UPDATE NOWAIT",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Write a product's stock level; the caller holds the row lock
pub async fn update_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    stock: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
        .bind(product_id)
        .bind(stock)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Append one movement row to the ledger
pub async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    movement: MovementInsert,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO inventory_movements
            (id, product_id, order_id, quantity_delta, stock_before, stock_after, movement_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(movement.product_id)
    .bind(movement.order_id)
    .bind(movement.quantity_delta)
    .bind(movement.stock_before)
    .bind(movement.stock_after)
    .bind(movement.movement_type)
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

/// Net stock delta an order currently holds against the catalog.
///
/// Negative means the order's line items are decremented and not yet
/// restored; zero means the ledger is balanced for this order.
pub async fn order_net_delta(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity_delta), 0)::BIGINT FROM inventory_movements WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(&mut **tx)
    .await
}

/// Count of movement rows recorded for an order
pub async fn movement_count_for_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM inventory_movements WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(&mut **tx)
    .await
}
