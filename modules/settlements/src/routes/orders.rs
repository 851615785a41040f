//! Order lifecycle API routes
//!
//! - POST   /api/orders/{order_id}/transition — apply one status transition
//! - DELETE /api/orders/{order_id}            — only for orders with no
//!   inventory movements; anything that touched stock must be cancelled so
//!   the movement ledger stays replayable.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::order_transition_v1::OrderTransitionV1;
use crate::repos::order_repo::Order;
use crate::routes::ApiError;
use crate::services::inventory_service::InventoryError;
use crate::services::order_transition_service::{self, TransitionError};
use crate::AppState;

/// Map transition errors to HTTP status codes
fn map_error(error: TransitionError) -> ApiError {
    match &error {
        TransitionError::OrderNotFound { .. } => {
            ApiError::new(StatusCode::NOT_FOUND, error.to_string())
        }
        TransitionError::ConcurrentModification { .. }
        | TransitionError::OrderHasMovements { .. } => {
            ApiError::new(StatusCode::CONFLICT, error.to_string())
        }
        TransitionError::InvalidStateTransition { .. } => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        TransitionError::Inventory(InventoryError::InsufficientStock { .. }) => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
        TransitionError::Inventory(InventoryError::Contention { .. }) => {
            ApiError::new(StatusCode::CONFLICT, error.to_string())
        }
        TransitionError::Inventory(InventoryError::Database(e))
        | TransitionError::Database(e) => {
            tracing::error!(error = %e, "Order transition failed with database error");
            ApiError::internal()
        }
    }
}

/// Handler for POST /api/orders/{order_id}/transition
pub async fn transition_handler(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<OrderTransitionV1>,
) -> Result<Json<Order>, ApiError> {
    let order = order_transition_service::transition(
        &state.pool,
        &request.store_id,
        order_id,
        request.target_status,
        &request.actor,
        request.restock,
    )
    .await
    .map_err(map_error)?;

    Ok(Json(order))
}

/// Query parameters for order deletion
#[derive(Debug, Deserialize)]
pub struct DeleteOrderQuery {
    pub store_id: String,
    pub actor: String,
}

/// Handler for DELETE /api/orders/{order_id}
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
    Query(query): Query<DeleteOrderQuery>,
) -> Result<StatusCode, ApiError> {
    order_transition_service::delete_order(&state.pool, &query.store_id, order_id, &query.actor)
        .await
        .map_err(map_error)?;

    Ok(StatusCode::NO_CONTENT)
}
