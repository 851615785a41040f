//! Repository for carriers and their delivery rates
//!
//! Rates are created and edited by an external admin surface; the
//! reconciliation flow only ever reads them, so no locking is needed here.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

/// Carrier master data
#[derive(Debug, Clone, FromRow)]
pub struct Carrier {
    pub id: Uuid,
    pub store_id: String,
    pub name: String,
    /// Percentage of the delivery fee billed for a failed attempt (0-100)
    pub failed_attempt_fee_percent: i32,
}

/// Scope of a carrier rate: a specific city, or a coarser named zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "rate_scope", rename_all = "snake_case")]
pub enum RateScope {
    City,
    Zone,
}

/// One delivery fee a carrier charges for a city or zone
#[derive(Debug, Clone, FromRow)]
pub struct CarrierRate {
    pub scope: RateScope,
    pub scope_value: String,
    pub fee_minor: i64,
}

/// Fetch a carrier by id within the store
pub async fn find_by_id(
    tx: &mut Transaction<'_, Postgres>,
    store_id: &str,
    carrier_id: Uuid,
) -> Result<Option<Carrier>, sqlx::Error> {
    sqlx::query_as::<_, Carrier>(
        r#"
        SELECT id, store_id, name, failed_attempt_fee_percent
        FROM carriers
        WHERE id = $1 AND store_id = $2
        "#,
    )
    .bind(carrier_id)
    .bind(store_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Fetch all active rates for a carrier.
///
/// Ordered deterministically so resolution never depends on row layout.
pub async fn fetch_active_rates(
    tx: &mut Transaction<'_, Postgres>,
    carrier_id: Uuid,
) -> Result<Vec<CarrierRate>, sqlx::Error> {
    sqlx::query_as::<_, CarrierRate>(
        r#"
        SELECT scope, scope_value, fee_minor
        FROM carrier_rates
        WHERE carrier_id = $1 AND is_active
        ORDER BY scope, scope_value, fee_minor
        "#,
    )
    .bind(carrier_id)
    .fetch_all(&mut **tx)
    .await
}
