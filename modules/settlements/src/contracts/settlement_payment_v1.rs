//! Settlement Payment V1 Contract Types
//!
//! Boundary payload from the accounting side: records cash received against
//! an existing settlement. Only `status` and `balance_due` may move — the
//! financial totals computed at reconciliation time are immutable.

use serde::{Deserialize, Serialize};

/// Payload for recording a payment against a settlement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementPaymentV1 {
    /// Store owning the settlement
    pub store_id: String,

    /// Amount paid, in minor units (must be positive)
    pub amount_minor: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_payment() {
        let json = r#"{"store_id": "store_acme", "amount_minor": 75000}"#;
        let payload: SettlementPaymentV1 = serde_json::from_str(json).unwrap();
        assert_eq!(payload.amount_minor, 75_000);
    }
}
