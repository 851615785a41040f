//! DB tests for order lifecycle transitions and the inventory ledger
//!
//! Require a running Postgres (DATABASE_URL); run with `cargo test -- --ignored`.

mod common;

use serial_test::serial;
use settlements_rs::lifecycle::OrderStatus;
use settlements_rs::repos::order_repo::PaymentKind;
use settlements_rs::services::inventory_service::InventoryError;
use settlements_rs::services::order_transition_service::{
    self, TransitionError,
};
use sqlx::PgPool;
use uuid::Uuid;

use common::*;

async fn movement_deltas(pool: &PgPool, order_id: Uuid) -> Vec<i32> {
    sqlx::query_scalar::<_, i32>(
        "SELECT quantity_delta FROM inventory_movements WHERE order_id = $1 ORDER BY created_at, id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .expect("Failed to read movements")
}

/// Replay the full ledger for a product from an initial stock level
async fn replay_stock(pool: &PgPool, product_id: Uuid, initial: i32) -> i32 {
    let total: i64 = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity_delta), 0)::BIGINT FROM inventory_movements WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await
    .expect("Failed to replay movements");

    initial + total as i32
}

async fn transition(
    pool: &PgPool,
    store: &str,
    order: Uuid,
    target: OrderStatus,
) -> Result<settlements_rs::repos::order_repo::Order, TransitionError> {
    order_transition_service::transition(pool, store, order, target, "tester", true).await
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_ready_to_ship_decrements_and_cancel_restores() {
    let pool = get_test_pool().await;
    let store = "t_life_cancel";
    cleanup_test_store(&pool, store).await;

    let product = setup_test_product(&pool, store, "Perfume 100ml", 10).await;
    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(product, 3)],
    )
    .await;

    transition(&pool, store, order, OrderStatus::ReadyToShip)
        .await
        .expect("transition to ready_to_ship failed");
    assert_eq!(product_stock(&pool, product).await, 7);
    assert_eq!(movement_deltas(&pool, order).await, vec![-3]);

    transition(&pool, store, order, OrderStatus::Cancelled)
        .await
        .expect("cancellation failed");
    assert_eq!(product_stock(&pool, product).await, 10);
    assert_eq!(movement_deltas(&pool, order).await, vec![-3, 3]);

    // Replaying the ledger reproduces current stock
    assert_eq!(replay_stock(&pool, product, 10).await, 10);

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_skip_transition_decrements_exactly_once() {
    let pool = get_test_pool().await;
    let store = "t_life_skip";
    cleanup_test_store(&pool, store).await;

    let product = setup_test_product(&pool, store, "Perfume 100ml", 10).await;
    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(product, 2)],
    )
    .await;

    // Skip straight from confirmed to shipped; still exactly one decrement
    transition(&pool, store, order, OrderStatus::Shipped)
        .await
        .expect("transition to shipped failed");
    assert_eq!(product_stock(&pool, product).await, 8);

    // Advancing within the stock-affecting band records nothing new
    transition(&pool, store, order, OrderStatus::InTransit)
        .await
        .expect("transition to in_transit failed");
    transition(&pool, store, order, OrderStatus::Delivered)
        .await
        .expect("transition to delivered failed");
    assert_eq!(product_stock(&pool, product).await, 8);
    assert_eq!(movement_deltas(&pool, order).await, vec![-2]);

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_insufficient_stock_aborts_whole_transition() {
    let pool = get_test_pool().await;
    let store = "t_life_nostock";
    cleanup_test_store(&pool, store).await;

    let scarce = setup_test_product(&pool, store, "Perfume 100ml", 1).await;
    let plenty = setup_test_product(&pool, store, "Perfume 50ml", 10).await;
    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(plenty, 2), (scarce, 3)],
    )
    .await;

    let result = transition(&pool, store, order, OrderStatus::ReadyToShip).await;
    assert!(matches!(
        result,
        Err(TransitionError::Inventory(InventoryError::InsufficientStock {
            requested: 3,
            available: 1,
            ..
        }))
    ));

    // The rollback must leave both products and the order untouched
    assert_eq!(product_stock(&pool, scarce).await, 1);
    assert_eq!(product_stock(&pool, plenty).await, 10);
    assert!(movement_deltas(&pool, order).await.is_empty());

    let unchanged = settlements_rs::repos::order_repo::find_by_id(&pool, store, order)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.status, OrderStatus::Confirmed);

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_deleted_product_line_is_skipped() {
    let pool = get_test_pool().await;
    let store = "t_life_ghost";
    cleanup_test_store(&pool, store).await;

    let ghost = setup_test_product(&pool, store, "Discontinued", 5).await;
    let live = setup_test_product(&pool, store, "Perfume 100ml", 10).await;
    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(ghost, 2), (live, 1)],
    )
    .await;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(ghost)
        .execute(&pool)
        .await
        .expect("Failed to delete product");

    // The transition still succeeds; only the surviving line moves stock
    let updated = transition(&pool, store, order, OrderStatus::ReadyToShip)
        .await
        .expect("transition failed");
    assert_eq!(updated.status, OrderStatus::ReadyToShip);
    assert_eq!(product_stock(&pool, live).await, 9);
    assert_eq!(movement_deltas(&pool, order).await, vec![-1]);

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_return_without_restock_keeps_stock_out() {
    let pool = get_test_pool().await;
    let store = "t_life_return";
    cleanup_test_store(&pool, store).await;

    let product = setup_test_product(&pool, store, "Perfume 100ml", 10).await;
    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(product, 4)],
    )
    .await;

    transition(&pool, store, order, OrderStatus::Delivered)
        .await
        .expect("transition to delivered failed");
    assert_eq!(product_stock(&pool, product).await, 6);

    // Damaged return: recorded on the ledger, stock stays out
    order_transition_service::transition(
        &pool,
        store,
        order,
        OrderStatus::Returned,
        "tester",
        false,
    )
    .await
    .expect("return failed");

    assert_eq!(product_stock(&pool, product).await, 6);
    assert_eq!(movement_deltas(&pool, order).await, vec![-4, 0]);
    assert_eq!(replay_stock(&pool, product, 10).await, 6);

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_return_with_restock_restores_stock() {
    let pool = get_test_pool().await;
    let store = "t_life_restock";
    cleanup_test_store(&pool, store).await;

    let product = setup_test_product(&pool, store, "Perfume 100ml", 10).await;
    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(product, 4)],
    )
    .await;

    transition(&pool, store, order, OrderStatus::Delivered)
        .await
        .expect("transition to delivered failed");
    transition(&pool, store, order, OrderStatus::Returned)
        .await
        .expect("return failed");

    assert_eq!(product_stock(&pool, product).await, 10);
    assert_eq!(movement_deltas(&pool, order).await, vec![-4, 4]);

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_reverting_to_pre_stock_status_restores_stock() {
    let pool = get_test_pool().await;
    let store = "t_life_revert";
    cleanup_test_store(&pool, store).await;

    let product = setup_test_product(&pool, store, "Perfume 100ml", 10).await;
    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(product, 3)],
    )
    .await;

    transition(&pool, store, order, OrderStatus::ReadyToShip)
        .await
        .expect("transition to ready_to_ship failed");
    assert_eq!(product_stock(&pool, product).await, 7);

    // Walking backwards to confirmed puts the units back
    transition(&pool, store, order, OrderStatus::Confirmed)
        .await
        .expect("revert failed");
    assert_eq!(product_stock(&pool, product).await, 10);
    assert_eq!(movement_deltas(&pool, order).await, vec![-3, 3]);

    // A second pass out decrements again
    transition(&pool, store, order, OrderStatus::ReadyToShip)
        .await
        .expect("second transition failed");
    assert_eq!(product_stock(&pool, product).await, 7);
    assert_eq!(movement_deltas(&pool, order).await, vec![-3, 3, -3]);

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_invalid_transitions_rejected() {
    let pool = get_test_pool().await;
    let store = "t_life_invalid";
    cleanup_test_store(&pool, store).await;

    let order = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Pending,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[],
    )
    .await;

    // not_delivered requires a dispatched order
    let result = transition(&pool, store, order, OrderStatus::NotDelivered).await;
    assert!(matches!(
        result,
        Err(TransitionError::InvalidStateTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::NotDelivered,
        })
    ));

    // Terminal statuses accept no further transitions
    transition(&pool, store, order, OrderStatus::Cancelled)
        .await
        .expect("cancellation failed");
    let result = transition(&pool, store, order, OrderStatus::Confirmed).await;
    assert!(matches!(
        result,
        Err(TransitionError::InvalidStateTransition { .. })
    ));

    cleanup_test_store(&pool, store).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_delete_guarded_by_movement_ledger() {
    let pool = get_test_pool().await;
    let store = "t_life_delete";
    cleanup_test_store(&pool, store).await;

    let product = setup_test_product(&pool, store, "Perfume 100ml", 10).await;

    // An order that moved stock can only be cancelled
    let shipped = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Confirmed,
        PaymentKind::Cod,
        100_000,
        "Asuncion",
        None,
        &[(product, 2)],
    )
    .await;
    transition(&pool, store, shipped, OrderStatus::ReadyToShip)
        .await
        .expect("transition failed");

    let result = order_transition_service::delete_order(&pool, store, shipped, "tester").await;
    assert!(matches!(
        result,
        Err(TransitionError::OrderHasMovements { order_id }) if order_id == shipped
    ));

    // A pending order with a clean ledger deletes fine
    let clean = setup_test_order(
        &pool,
        store,
        None,
        OrderStatus::Pending,
        PaymentKind::Cod,
        50_000,
        "Asuncion",
        None,
        &[(product, 1)],
    )
    .await;
    order_transition_service::delete_order(&pool, store, clean, "tester")
        .await
        .expect("delete failed");

    let gone = settlements_rs::repos::order_repo::find_by_id(&pool, store, clean)
        .await
        .unwrap();
    assert!(gone.is_none());

    cleanup_test_store(&pool, store).await;
}
