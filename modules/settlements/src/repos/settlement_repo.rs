//! Repository for settlement rows
//!
//! A settlement's financial totals are written exactly once, by the
//! reconciliation engine; later mutations touch only `status` and
//! `balance_due_minor`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Settlement lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "settlement_status", rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Paid,
    Cancelled,
}

/// Settlement row (for reading from DB)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Settlement {
    pub id: Uuid,
    pub code: String,
    pub store_id: String,
    pub carrier_id: Uuid,
    pub settlement_date: NaiveDate,
    pub dispatched_count: i32,
    pub delivered_count: i32,
    pub not_delivered_count: i32,
    pub total_cod_expected_minor: i64,
    pub total_cod_collected_minor: i64,
    pub total_carrier_fees_minor: i64,
    pub total_failed_attempt_fees_minor: i64,
    pub net_receivable_minor: i64,
    pub balance_due_minor: i64,
    pub status: SettlementStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Struct for inserting a settlement
#[derive(Debug, Clone)]
pub struct SettlementInsert {
    pub id: Uuid,
    pub code: String,
    pub store_id: String,
    pub carrier_id: Uuid,
    pub settlement_date: NaiveDate,
    pub dispatched_count: i32,
    pub delivered_count: i32,
    pub not_delivered_count: i32,
    pub total_cod_expected_minor: i64,
    pub total_cod_collected_minor: i64,
    pub total_carrier_fees_minor: i64,
    pub total_failed_attempt_fees_minor: i64,
    pub net_receivable_minor: i64,
    pub notes: Option<String>,
    pub created_by: String,
}

const SETTLEMENT_COLUMNS: &str = "id, code, store_id, carrier_id, settlement_date, \
     dispatched_count, delivered_count, not_delivered_count, \
     total_cod_expected_minor, total_cod_collected_minor, total_carrier_fees_minor, \
     total_failed_attempt_fees_minor, net_receivable_minor, balance_due_minor, \
     status, notes, created_by, created_at";

/// Highest sequence number already used for a store-day, parsed from the
/// trailing `-NNN` of existing codes. 0 when none exist. Only meaningful
/// while the caller holds the (store, date) advisory lock.
pub async fn max_sequence_for_day(
    tx: &mut Transaction<'_, Postgres>,
    store_id: &str,
    date: NaiveDate,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        r#"
        SELECT COALESCE(MAX((regexp_match(code, '-(\d{3})$'))[1]::INTEGER), 0)
        FROM settlements
        WHERE store_id = $1 AND settlement_date = $2
        "#,
    )
    .bind(store_id)
    .bind(date)
    .fetch_one(&mut **tx)
    .await
}

/// Insert a settlement with status pending and balance due equal to the
/// net receivable. Returns the stored row so callers never have to re-read
/// what they just committed.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    settlement: &SettlementInsert,
) -> Result<Settlement, sqlx::Error> {
    sqlx::query_as::<_, Settlement>(&format!(
        r#"
        INSERT INTO settlements
            (id, code, store_id, carrier_id, settlement_date,
             dispatched_count, delivered_count, not_delivered_count,
             total_cod_expected_minor, total_cod_collected_minor,
             total_carrier_fees_minor, total_failed_attempt_fees_minor,
             net_receivable_minor, balance_due_minor, status, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13, 'pending', $14, $15)
        RETURNING {SETTLEMENT_COLUMNS}
        "#
    ))
    .bind(settlement.id)
    .bind(&settlement.code)
    .bind(&settlement.store_id)
    .bind(settlement.carrier_id)
    .bind(settlement.settlement_date)
    .bind(settlement.dispatched_count)
    .bind(settlement.delivered_count)
    .bind(settlement.not_delivered_count)
    .bind(settlement.total_cod_expected_minor)
    .bind(settlement.total_cod_collected_minor)
    .bind(settlement.total_carrier_fees_minor)
    .bind(settlement.total_failed_attempt_fees_minor)
    .bind(settlement.net_receivable_minor)
    .bind(&settlement.notes)
    .bind(&settlement.created_by)
    .fetch_one(&mut **tx)
    .await
}

/// Fetch a settlement by id within the store
pub async fn find_by_id(
    pool: &PgPool,
    store_id: &str,
    settlement_id: Uuid,
) -> Result<Option<Settlement>, sqlx::Error> {
    sqlx::query_as::<_, Settlement>(&format!(
        "SELECT {SETTLEMENT_COLUMNS} FROM settlements WHERE id = $1 AND store_id = $2"
    ))
    .bind(settlement_id)
    .bind(store_id)
    .fetch_optional(pool)
    .await
}

/// Lock a settlement row for a payment update
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    store_id: &str,
    settlement_id: Uuid,
) -> Result<Option<Settlement>, sqlx::Error> {
    sqlx::query_as::<_, Settlement>(&format!(
        "SELECT {SETTLEMENT_COLUMNS} FROM settlements WHERE id = $1 AND store_id = $2 FOR UPDATE"
    ))
    .bind(settlement_id)
    .bind(store_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Update only the payment-tracking fields of a settlement.
///
/// Financial totals are deliberately absent from this statement; they are
/// immutable after creation.
pub async fn update_payment_state(
    tx: &mut Transaction<'_, Postgres>,
    settlement_id: Uuid,
    status: SettlementStatus,
    balance_due_minor: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE settlements SET status = $2, balance_due_minor = $3 WHERE id = $1")
        .bind(settlement_id)
        .bind(status)
        .bind(balance_due_minor)
        .execute(&mut **tx)
        .await?;

    Ok(())
}
