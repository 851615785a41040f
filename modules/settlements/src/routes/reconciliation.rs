//! Reconciliation API route
//!
//! POST /api/settlements/reconcile — settle one courier's deliveries for
//! one date. Returns the created settlement, or a typed error the operator
//! can act on (which order, which carrier, what state).

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::contracts::reconcile_request_v1::ReconcileRequestV1;
use crate::repos::settlement_repo::Settlement;
use crate::routes::ApiError;
use crate::services::reconciliation_service::{self, ReconcileError};
use crate::services::settlement_code::CodeError;
use crate::AppState;

/// Map engine errors to HTTP status codes
fn map_error(error: ReconcileError) -> ApiError {
    match &error {
        ReconcileError::Validation(_) => ApiError::new(StatusCode::BAD_REQUEST, error.to_string()),
        ReconcileError::CarrierNotFound { .. } | ReconcileError::OrderNotFound { .. } => {
            ApiError::new(StatusCode::NOT_FOUND, error.to_string())
        }
        ReconcileError::AlreadyReconciled { .. }
        | ReconcileError::ConcurrentModification { .. } => {
            ApiError::new(StatusCode::CONFLICT, error.to_string())
        }
        ReconcileError::CarrierMismatch { .. } | ReconcileError::OrderNotDispatched { .. } => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        ReconcileError::Code(CodeError::SequenceExhausted { .. }) => {
            ApiError::new(StatusCode::CONFLICT, error.to_string())
        }
        ReconcileError::Code(CodeError::Database(e)) => {
            tracing::error!(error = %e, "Reconciliation failed with database error");
            ApiError::internal()
        }
        ReconcileError::Database(e) => {
            tracing::error!(error = %e, "Reconciliation failed with database error");
            ApiError::internal()
        }
    }
}

/// Handler for POST /api/settlements/reconcile
pub async fn reconcile_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReconcileRequestV1>,
) -> Result<Json<Settlement>, ApiError> {
    let settlement = reconciliation_service::reconcile(
        &state.pool,
        state.config.statement_timeout_ms,
        &request,
    )
    .await
    .map_err(map_error)?;

    Ok(Json(settlement))
}
