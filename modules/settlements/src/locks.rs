//! Transaction-scoped advisory locking
//!
//! Two lock scopes are derived from the same hash function:
//! - (store, carrier, date) serializes whole reconciliation attempts for one
//!   carrier-day without blocking unrelated carrier-days;
//! - (store, date) serializes settlement code generation across all carriers
//!   of one store-day, which is what keeps sequence numbers strictly
//!   increasing.
//!
//! Locks are taken with `pg_advisory_xact_lock` and released automatically on
//! commit or rollback, so lock lifetime can never outlive the transaction.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Derive a 64-bit advisory lock key from a namespace and its parts.
///
/// SHA-256 over `namespace|part|part|...`, truncated to the first 8 bytes.
/// Deterministic across processes; collisions would only cause spurious
/// serialization, never missed exclusion.
fn derive_key(namespace: &str, parts: &[&str]) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    for part in parts {
        hasher.update(b"|");
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

/// Lock key for one carrier-day reconciliation
pub fn reconciliation_key(store_id: &str, carrier_id: Uuid, date: NaiveDate) -> i64 {
    derive_key(
        "settlement-reconcile",
        &[store_id, &carrier_id.to_string(), &date.to_string()],
    )
}

/// Lock key for one store-day settlement code sequence
pub fn code_sequence_key(store_id: &str, date: NaiveDate) -> i64 {
    derive_key("settlement-code", &[store_id, &date.to_string()])
}

/// True when an error is Postgres `lock_not_available` (SQLSTATE 55P03),
/// i.e. a `FOR UPDATE NOWAIT` hit a row another transaction holds. Callers
/// surface this as a retryable conflict instead of queuing behind the lock.
pub fn is_lock_not_available(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("55P03"),
        _ => false,
    }
}

/// Acquire a transaction-scoped advisory lock; blocks until granted
pub async fn acquire_xact_lock(
    tx: &mut Transaction<'_, Postgres>,
    key: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(key)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
