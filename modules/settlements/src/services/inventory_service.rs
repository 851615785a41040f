//! Inventory ledger service
//!
//! Applies stock deltas for an order's line items and records every change
//! as an immutable movement row. Stock rows are locked `FOR UPDATE NOWAIT`
//! before reading, so two orders racing on the same product surface a
//! conflict instead of losing an update.

use sqlx::{Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::locks;
use crate::repos::inventory_repo::{self, MovementInsert, MovementType};
use crate::repos::order_repo::OrderItem;

/// Errors that can occur while applying stock deltas
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Product {product_id} is locked by another transaction")]
    Contention { product_id: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Decrement stock for every line item of an order, all-or-nothing.
///
/// Runs inside the caller's transaction: if any line item lacks stock the
/// error aborts the whole transaction and no movement survives. A line item
/// whose product was deleted from the catalog is skipped with a warning —
/// orders must not become unfulfillable because of catalog cleanup.
pub async fn decrement_for_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    items: &[OrderItem],
) -> Result<(), InventoryError> {
    for item in items {
        apply_delta(tx, order_id, item, -item.quantity, MovementType::OrderReady).await?;
    }

    Ok(())
}

/// Restore stock for every line item of an order.
///
/// `movement_type` records why: cancellation/rejection, a revert to an
/// earlier status, or an accepted return.
pub async fn restore_for_order(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    items: &[OrderItem],
    movement_type: MovementType,
) -> Result<(), InventoryError> {
    for item in items {
        apply_delta(tx, order_id, item, item.quantity, movement_type).await?;
    }

    Ok(())
}

/// Record a rejected return: the decision lands on the ledger as zero-delta
/// movements without touching stock.
pub async fn record_rejected_return(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    items: &[OrderItem],
) -> Result<(), InventoryError> {
    for item in items {
        apply_delta(tx, order_id, item, 0, MovementType::ReturnRejected).await?;
    }

    Ok(())
}

async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    item: &OrderItem,
    delta: i32,
    movement_type: MovementType,
) -> Result<(), InventoryError> {
    let stock_row = inventory_repo::lock_stock_nowait(tx, item.product_id)
        .await
        .map_err(|e| {
            if locks::is_lock_not_available(&e) {
                InventoryError::Contention {
                    product_id: item.product_id,
                }
            } else {
                InventoryError::Database(e)
            }
        })?;

    let Some(product) = stock_row else {
        // Deleted catalog entry: the order still proceeds, just without a
        // movement for this line item.
        tracing::warn!(
            order_id = %order_id,
            product_id = %item.product_id,
            line_no = item.line_no,
            "Product no longer exists in catalog, skipping stock movement"
        );
        return Ok(());
    };

    let stock_before = product.stock;
    let stock_after = stock_before + delta;

    if stock_after < 0 {
        return Err(InventoryError::InsufficientStock {
            product_id: item.product_id,
            requested: -delta,
            available: stock_before,
        });
    }

    if delta != 0 {
        inventory_repo::update_stock(tx, item.product_id, stock_after).await?;
    }

    inventory_repo::insert_movement(
        tx,
        MovementInsert {
            product_id: item.product_id,
            order_id,
            quantity_delta: delta,
            stock_before,
            stock_after,
            movement_type,
        },
    )
    .await?;

    tracing::debug!(
        order_id = %order_id,
        product_id = %item.product_id,
        delta = delta,
        stock_before = stock_before,
        stock_after = stock_after,
        "Recorded inventory movement"
    );

    Ok(())
}
