//! Reconciliation engine
//!
//! Settles one courier's deliveries for one date: locks the carrier-day,
//! locks and stamps every submitted order exactly once, resolves carrier
//! fees, aggregates the money, and writes one settlement row — all inside a
//! single transaction. Two concurrent attempts for the same carrier-day can
//! never double-count or double-pay: the advisory lock serializes whole
//! attempts, and per-order `FOR UPDATE NOWAIT` locks turn any remaining
//! interleaving into a surfaced, retryable conflict.
//!
//! Lock ordering is fixed — advisory lock first, then row locks — so the
//! engine cannot deadlock against itself.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::reconcile_request_v1::ReconcileRequestV1;
use crate::lifecycle::OrderStatus;
use crate::locks;
use crate::repos::carrier_repo;
use crate::repos::order_repo::{self, PaymentKind};
use crate::repos::settlement_repo::{self, Settlement, SettlementInsert};
use crate::services::rate_resolver;
use crate::services::settlement_code::{self, CodeError};
use crate::validation::{self, ValidationError};

/// Errors that can occur during reconciliation
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Carrier not found: {carrier_id}")]
    CarrierNotFound { carrier_id: Uuid },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: Uuid },

    #[error("Order {order_id} is already part of a settlement")]
    AlreadyReconciled { order_id: Uuid },

    #[error("Order {order_id} is not assigned to carrier {carrier_id}")]
    CarrierMismatch { order_id: Uuid, carrier_id: Uuid },

    #[error("Order {order_id} is {status:?} and was never dispatched with a courier")]
    OrderNotDispatched { order_id: Uuid, status: OrderStatus },

    #[error("Order {order_id} is being modified by another transaction")]
    ConcurrentModification { order_id: Uuid },

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One settled order, reduced to the fields the aggregation needs
#[derive(Debug, Clone)]
pub struct ReconciledOrder {
    pub delivered: bool,
    pub fee_minor: i64,
    pub total_minor: i64,
    pub payment_kind: PaymentKind,
}

/// Aggregated money and counts for a settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementTotals {
    pub delivered_count: i32,
    pub not_delivered_count: i32,
    pub total_cod_expected_minor: i64,
    pub total_carrier_fees_minor: i64,
    pub total_failed_attempt_fees_minor: i64,
}

/// Fold settled orders into settlement totals.
///
/// Commutative sums only, so the result is independent of submission order.
/// A failed attempt still consumed the courier's trip: it is billed at
/// `failed_attempt_fee_percent` of the delivery fee.
pub fn aggregate_outcomes(orders: &[ReconciledOrder], failed_fee_percent: i32) -> SettlementTotals {
    let mut totals = SettlementTotals {
        delivered_count: 0,
        not_delivered_count: 0,
        total_cod_expected_minor: 0,
        total_carrier_fees_minor: 0,
        total_failed_attempt_fees_minor: 0,
    };

    for order in orders {
        if order.delivered {
            totals.delivered_count += 1;
            totals.total_carrier_fees_minor += order.fee_minor;
            if order.payment_kind == PaymentKind::Cod {
                totals.total_cod_expected_minor += order.total_minor;
            }
        } else {
            totals.not_delivered_count += 1;
            totals.total_failed_attempt_fees_minor +=
                order.fee_minor * i64::from(failed_fee_percent) / 100;
        }
    }

    totals
}

/// Net amount the courier owes the store for this settlement
pub fn net_receivable(total_cash_collected_minor: i64, totals: &SettlementTotals) -> i64 {
    total_cash_collected_minor
        - totals.total_carrier_fees_minor
        - totals.total_failed_attempt_fees_minor
}

/// Settle one carrier-day.
///
/// The whole protocol runs in one transaction:
/// 1. advisory lock on (store, carrier, date);
/// 2. load carrier and its active rates;
/// 3. per order: exclusive NOWAIT row lock, already-reconciled, carrier and
///    dispatch checks, fee resolution, `reconciled_at` stamp;
/// 4. aggregate totals and compute the net receivable;
/// 5. mint the settlement code under the (store, date) lock and insert the
///    settlement row.
///
/// Any failure rolls back everything — a partial settlement never exists.
pub async fn reconcile(
    pool: &PgPool,
    statement_timeout_ms: u64,
    request: &ReconcileRequestV1,
) -> Result<Settlement, ReconcileError> {
    // Rejected before any lock is taken: no side effects
    validation::validate_reconcile_request(request)?;

    let mut tx = pool.begin().await?;

    // Bounded statement time inside the settlement transaction; SET LOCAL
    // reverts at commit/rollback.
    sqlx::query(&format!("SET LOCAL statement_timeout = {statement_timeout_ms}"))
        .execute(&mut *tx)
        .await?;

    locks::acquire_xact_lock(
        &mut tx,
        locks::reconciliation_key(&request.store_id, request.carrier_id, request.delivery_date),
    )
    .await?;

    let carrier = carrier_repo::find_by_id(&mut tx, &request.store_id, request.carrier_id)
        .await?
        .ok_or(ReconcileError::CarrierNotFound {
            carrier_id: request.carrier_id,
        })?;

    let rates = carrier_repo::fetch_active_rates(&mut tx, carrier.id).await?;

    let mut settled: Vec<ReconciledOrder> = Vec::with_capacity(request.orders.len());

    for outcome in &request.orders {
        let order = order_repo::lock_for_update_nowait(&mut tx, &request.store_id, outcome.order_id)
            .await
            .map_err(|e| {
                if locks::is_lock_not_available(&e) {
                    ReconcileError::ConcurrentModification {
                        order_id: outcome.order_id,
                    }
                } else {
                    ReconcileError::Database(e)
                }
            })?
            .ok_or(ReconcileError::OrderNotFound {
                order_id: outcome.order_id,
            })?;

        if order.reconciled_at.is_some() {
            return Err(ReconcileError::AlreadyReconciled {
                order_id: order.id,
            });
        }

        // Self-pickup orders (no carrier) are exempt from settlement, and an
        // order dispatched with a different courier belongs in that
        // courier's settlement.
        if order.carrier_id != Some(carrier.id) {
            return Err(ReconcileError::CarrierMismatch {
                order_id: order.id,
                carrier_id: carrier.id,
            });
        }

        // Only orders the courier actually took out can settle; this is what
        // keeps `mark_reconciled` from flipping a terminal or still-in-the-
        // warehouse order to delivered.
        if !order.status.dispatched() {
            return Err(ReconcileError::OrderNotDispatched {
                order_id: order.id,
                status: order.status,
            });
        }

        let fee_minor =
            rate_resolver::resolve_fee(&rates, &order.shipping_city, order.delivery_zone.as_deref());

        order_repo::mark_reconciled(&mut tx, order.id, outcome.delivered).await?;

        settled.push(ReconciledOrder {
            delivered: outcome.delivered,
            fee_minor,
            total_minor: order.total_minor,
            payment_kind: order.payment_kind,
        });
    }

    let totals = aggregate_outcomes(&settled, carrier.failed_attempt_fee_percent);
    let net = net_receivable(request.total_cash_collected_minor, &totals);

    let code = settlement_code::next_code(&mut tx, &request.store_id, request.delivery_date).await?;

    let insert = SettlementInsert {
        id: Uuid::new_v4(),
        code,
        store_id: request.store_id.clone(),
        carrier_id: carrier.id,
        settlement_date: request.delivery_date,
        dispatched_count: settled.len() as i32,
        delivered_count: totals.delivered_count,
        not_delivered_count: totals.not_delivered_count,
        total_cod_expected_minor: totals.total_cod_expected_minor,
        total_cod_collected_minor: request.total_cash_collected_minor,
        total_carrier_fees_minor: totals.total_carrier_fees_minor,
        total_failed_attempt_fees_minor: totals.total_failed_attempt_fees_minor,
        net_receivable_minor: net,
        notes: request.discrepancy_notes.clone(),
        created_by: request.user_id.clone(),
    };

    let settlement = settlement_repo::insert(&mut tx, &insert).await?;

    // All reconciled_at stamps and the settlement row land together or not
    // at all
    tx.commit().await?;

    tracing::info!(
        settlement_id = %settlement.id,
        code = %settlement.code,
        store_id = %request.store_id,
        carrier = %carrier.name,
        dispatched = settlement.dispatched_count,
        delivered = settlement.delivered_count,
        net_receivable_minor = net,
        "Settlement created"
    );

    Ok(settlement)
}
