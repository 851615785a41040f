//! Order Transition V1 Contract Types

use serde::{Deserialize, Serialize};

use crate::lifecycle::OrderStatus;

/// Payload for applying one status transition to an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderTransitionV1 {
    /// Store owning the order
    pub store_id: String,

    /// Status to transition into
    pub target_status: OrderStatus,

    /// Operator performing the transition
    pub actor: String,

    /// For transitions into `returned`: whether the returned goods go back
    /// to stock. Ignored for every other target.
    #[serde(default = "default_restock")]
    pub restock: bool,
}

fn default_restock() -> bool {
    true
}
