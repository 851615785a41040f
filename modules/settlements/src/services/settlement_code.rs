//! Settlement code generation
//!
//! Codes are human-readable and sequential per (store, date):
//! `LIQ-DDMMYYYY-NNN` with a zero-padded sequence. The sequence is computed
//! as max-plus-one under the store-day advisory lock, which is the primary
//! uniqueness mechanism; the `(store_id, code)` unique constraint is only a
//! backstop.

use chrono::NaiveDate;
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::locks;
use crate::repos::settlement_repo;

pub const CODE_PREFIX: &str = "LIQ";

/// Three digits of sequence per store-day
pub const MAX_SEQUENCE: i32 = 999;

/// Errors that can occur during code generation
#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Settlement code sequence exhausted for store {store_id} on {date} (max {MAX_SEQUENCE})")]
    SequenceExhausted { store_id: String, date: NaiveDate },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Format a settlement code from its date and sequence number
pub fn format_code(date: NaiveDate, sequence: i32) -> String {
    format!("{}-{}-{:03}", CODE_PREFIX, date.format("%d%m%Y"), sequence)
}

/// Mint the next settlement code for a store-day.
///
/// Takes the (store, date) advisory lock for the remainder of the enclosing
/// transaction, so concurrent reconciliations of different carriers on the
/// same store-day serialize here and sequence numbers come out strictly
/// increasing.
pub async fn next_code(
    tx: &mut Transaction<'_, Postgres>,
    store_id: &str,
    date: NaiveDate,
) -> Result<String, CodeError> {
    locks::acquire_xact_lock(tx, locks::code_sequence_key(store_id, date)).await?;

    let current_max = settlement_repo::max_sequence_for_day(tx, store_id, date).await?;

    if current_max >= MAX_SEQUENCE {
        return Err(CodeError::SequenceExhausted {
            store_id: store_id.to_string(),
            date,
        });
    }

    Ok(format_code(date, current_max + 1))
}
