//! Settlement query and payment API routes
//!
//! - GET  /api/settlements/{settlement_id}?store_id= — fetch one settlement
//! - POST /api/settlements/{settlement_id}/payment   — record a payment
//!   (status and balance only; financial totals are immutable)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::settlement_payment_v1::SettlementPaymentV1;
use crate::repos::settlement_repo::{self, Settlement};
use crate::routes::ApiError;
use crate::services::payment_service::{self, PaymentError};
use crate::AppState;

/// Map payment errors to HTTP status codes
fn map_error(error: PaymentError) -> ApiError {
    match &error {
        PaymentError::Validation(_) => ApiError::new(StatusCode::BAD_REQUEST, error.to_string()),
        PaymentError::SettlementNotFound { .. } => {
            ApiError::new(StatusCode::NOT_FOUND, error.to_string())
        }
        PaymentError::SettlementClosed { .. } => {
            ApiError::new(StatusCode::CONFLICT, error.to_string())
        }
        PaymentError::PaymentExceedsBalance { .. } => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        PaymentError::Database(e) => {
            tracing::error!(error = %e, "Payment recording failed with database error");
            ApiError::internal()
        }
    }
}

/// Query parameters for settlement lookup
#[derive(Debug, Deserialize)]
pub struct SettlementQuery {
    pub store_id: String,
}

/// Handler for GET /api/settlements/{settlement_id}
pub async fn get_settlement(
    State(state): State<Arc<AppState>>,
    Path(settlement_id): Path<Uuid>,
    Query(query): Query<SettlementQuery>,
) -> Result<Json<Settlement>, ApiError> {
    let settlement = settlement_repo::find_by_id(&state.pool, &query.store_id, settlement_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Settlement lookup failed");
            ApiError::internal()
        })?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                format!(
                    "Settlement {} not found for store {}",
                    settlement_id, query.store_id
                ),
            )
        })?;

    Ok(Json(settlement))
}

/// Handler for POST /api/settlements/{settlement_id}/payment
pub async fn record_payment_handler(
    State(state): State<Arc<AppState>>,
    Path(settlement_id): Path<Uuid>,
    Json(request): Json<SettlementPaymentV1>,
) -> Result<Json<Settlement>, ApiError> {
    let settlement = payment_service::record_payment(
        &state.pool,
        &request.store_id,
        settlement_id,
        request.amount_minor,
    )
    .await
    .map_err(map_error)?;

    Ok(Json(settlement))
}
