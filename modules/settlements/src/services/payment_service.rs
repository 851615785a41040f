//! Settlement payment recording
//!
//! Boundary operation for the accounting side: applies a payment to an
//! existing settlement. Only `status` and `balance_due_minor` move here;
//! the financial totals written by the reconciliation engine are immutable.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::repos::settlement_repo::{self, Settlement, SettlementStatus};
use crate::validation::{self, ValidationError};

/// Errors that can occur while recording a payment
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Settlement not found: {settlement_id}")]
    SettlementNotFound { settlement_id: Uuid },

    #[error("Settlement {settlement_id} is {status:?} and cannot accept payments")]
    SettlementClosed {
        settlement_id: Uuid,
        status: SettlementStatus,
    },

    #[error("Payment of {amount_minor} exceeds remaining balance {balance_minor} on settlement {settlement_id}")]
    PaymentExceedsBalance {
        settlement_id: Uuid,
        amount_minor: i64,
        balance_minor: i64,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Record a payment against a pending settlement.
///
/// Reduces the balance due; a balance of zero marks the settlement paid.
pub async fn record_payment(
    pool: &PgPool,
    store_id: &str,
    settlement_id: Uuid,
    amount_minor: i64,
) -> Result<Settlement, PaymentError> {
    validation::validate_payment_amount(amount_minor)?;

    let mut tx = pool.begin().await?;

    let settlement = settlement_repo::lock_for_update(&mut tx, store_id, settlement_id)
        .await?
        .ok_or(PaymentError::SettlementNotFound { settlement_id })?;

    if settlement.status != SettlementStatus::Pending {
        return Err(PaymentError::SettlementClosed {
            settlement_id,
            status: settlement.status,
        });
    }

    if amount_minor > settlement.balance_due_minor {
        return Err(PaymentError::PaymentExceedsBalance {
            settlement_id,
            amount_minor,
            balance_minor: settlement.balance_due_minor,
        });
    }

    let new_balance = settlement.balance_due_minor - amount_minor;
    let new_status = if new_balance == 0 {
        SettlementStatus::Paid
    } else {
        SettlementStatus::Pending
    };

    settlement_repo::update_payment_state(&mut tx, settlement_id, new_status, new_balance).await?;

    tx.commit().await?;

    tracing::info!(
        settlement_id = %settlement_id,
        store_id = %store_id,
        amount_minor = amount_minor,
        balance_due_minor = new_balance,
        status = ?new_status,
        "Payment recorded"
    );

    let updated = settlement_repo::find_by_id(pool, store_id, settlement_id)
        .await?
        .ok_or(PaymentError::SettlementNotFound { settlement_id })?;

    Ok(updated)
}
