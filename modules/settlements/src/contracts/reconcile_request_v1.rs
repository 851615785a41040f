//! Reconciliation Request V1 Contract Types
//!
//! Operator-facing payload for settling one courier's deliveries for one
//! date against the cash actually handed over.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload for a reconciliation submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconcileRequestV1 {
    /// Store whose orders are being settled
    pub store_id: String,

    /// Operator submitting the reconciliation (recorded as created_by)
    pub user_id: String,

    /// Courier being settled
    pub carrier_id: Uuid,

    /// Date the deliveries were attempted (YYYY-MM-DD)
    pub delivery_date: NaiveDate,

    /// Total cash the courier handed over, in minor units (must be >= 0)
    pub total_cash_collected_minor: i64,

    /// Optional operator note when collected cash does not match expectation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy_notes: Option<String>,

    /// Per-order delivery outcomes (must be non-empty, no duplicates)
    pub orders: Vec<OrderOutcomeV1>,
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderOutcomeV1 {
    pub order_id: Uuid,
    pub delivered: bool,
}
