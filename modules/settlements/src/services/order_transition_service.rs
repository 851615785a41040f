//! Order status transition service
//!
//! Validates and applies one status transition on one order, firing the
//! inventory ledger as a side effect where the lifecycle demands it. The
//! order row is locked exclusively before the current status is read, so a
//! transition attempted against a stale status fails instead of silently
//! overwriting a concurrent one.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::{self, OrderStatus};
use crate::locks;
use crate::repos::inventory_repo::{self, MovementType};
use crate::repos::order_repo::{self, Order};
use crate::services::inventory_service::{self, InventoryError};

/// Errors that can occur during an order transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: Uuid },

    #[error("Order {order_id} is being modified by another transaction")]
    ConcurrentModification { order_id: Uuid },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {order_id} has inventory movements and must be cancelled, not deleted")]
    OrderHasMovements { order_id: Uuid },

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn map_lock_error(err: sqlx::Error, order_id: Uuid) -> TransitionError {
    if locks::is_lock_not_available(&err) {
        TransitionError::ConcurrentModification { order_id }
    } else {
        TransitionError::Database(err)
    }
}

/// Apply one status transition to an order.
///
/// `restock` only matters for transitions into `returned`: true restores
/// stock (`return_accepted`), false records the rejection on the ledger
/// without touching stock.
pub async fn transition(
    pool: &PgPool,
    store_id: &str,
    order_id: Uuid,
    target: OrderStatus,
    actor: &str,
    restock: bool,
) -> Result<Order, TransitionError> {
    let mut tx = pool.begin().await?;

    let order = order_repo::lock_for_update_nowait(&mut tx, store_id, order_id)
        .await
        .map_err(|e| map_lock_error(e, order_id))?
        .ok_or(TransitionError::OrderNotFound { order_id })?;

    if !lifecycle::transition_allowed(order.status, target, order.reconciled_at.is_some()) {
        return Err(TransitionError::InvalidStateTransition {
            from: order.status,
            to: target,
        });
    }

    // The ledger, not the status enum, says whether stock is currently out:
    // skip transitions and the not_delivered/incident branches keep the
    // decrement in place.
    let currently_decremented = inventory_repo::order_net_delta(&mut tx, order_id).await? < 0;

    if target.stock_affecting() && !currently_decremented {
        let items = order_repo::fetch_items(&mut tx, order_id).await?;
        inventory_service::decrement_for_order(&mut tx, order_id, &items).await?;
    } else if currently_decremented {
        match target {
            OrderStatus::Cancelled | OrderStatus::Rejected => {
                let items = order_repo::fetch_items(&mut tx, order_id).await?;
                inventory_service::restore_for_order(
                    &mut tx,
                    order_id,
                    &items,
                    MovementType::OrderCancelled,
                )
                .await?;
            }
            OrderStatus::Returned => {
                let items = order_repo::fetch_items(&mut tx, order_id).await?;
                if restock {
                    inventory_service::restore_for_order(
                        &mut tx,
                        order_id,
                        &items,
                        MovementType::ReturnAccepted,
                    )
                    .await?;
                } else {
                    inventory_service::record_rejected_return(&mut tx, order_id, &items).await?;
                }
            }
            t if t.pre_stock() => {
                let items = order_repo::fetch_items(&mut tx, order_id).await?;
                inventory_service::restore_for_order(
                    &mut tx,
                    order_id,
                    &items,
                    MovementType::OrderReverted,
                )
                .await?;
            }
            _ => {}
        }
    }

    let updated = order_repo::update_status(&mut tx, order_id, target).await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        store_id = %store_id,
        from = ?order.status,
        to = ?target,
        actor = %actor,
        "Order transitioned"
    );

    Ok(updated)
}

/// Delete an order that never reached a stock-affecting status.
///
/// An order with any inventory movement must be cancelled instead, so the
/// movement ledger stays replayable.
pub async fn delete_order(
    pool: &PgPool,
    store_id: &str,
    order_id: Uuid,
    actor: &str,
) -> Result<(), TransitionError> {
    let mut tx = pool.begin().await?;

    order_repo::lock_for_update_nowait(&mut tx, store_id, order_id)
        .await
        .map_err(|e| map_lock_error(e, order_id))?
        .ok_or(TransitionError::OrderNotFound { order_id })?;

    let movements = inventory_repo::movement_count_for_order(&mut tx, order_id).await?;
    if movements > 0 {
        return Err(TransitionError::OrderHasMovements { order_id });
    }

    order_repo::delete(&mut tx, store_id, order_id).await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        store_id = %store_id,
        actor = %actor,
        "Order deleted"
    );

    Ok(())
}
