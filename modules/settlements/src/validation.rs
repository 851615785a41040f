//! Request validation for the reconciliation surface
//!
//! Pure checks, run before any lock is taken: a rejected request has no
//! side effects at all.

use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::reconcile_request_v1::ReconcileRequestV1;

/// Validation errors for reconciliation requests
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("total_cash_collected_minor must be non-negative, got {0}")]
    NegativeCashCollected(i64),

    #[error("orders must not be empty")]
    EmptyOrderList,

    #[error("order {0} appears more than once in the request")]
    DuplicateOrder(Uuid),

    #[error("store_id must not be empty")]
    EmptyStoreId,

    #[error("payment amount must be positive, got {0}")]
    InvalidPaymentAmount(i64),
}

/// Validate a reconciliation request payload
///
/// # Validation Rules
///
/// - `store_id`: non-empty
/// - `total_cash_collected_minor`: >= 0
/// - `orders`: non-empty, no order id submitted twice
pub fn validate_reconcile_request(payload: &ReconcileRequestV1) -> Result<(), ValidationError> {
    if payload.store_id.trim().is_empty() {
        return Err(ValidationError::EmptyStoreId);
    }

    if payload.total_cash_collected_minor < 0 {
        return Err(ValidationError::NegativeCashCollected(
            payload.total_cash_collected_minor,
        ));
    }

    if payload.orders.is_empty() {
        return Err(ValidationError::EmptyOrderList);
    }

    let mut seen = HashSet::with_capacity(payload.orders.len());
    for outcome in &payload.orders {
        if !seen.insert(outcome.order_id) {
            return Err(ValidationError::DuplicateOrder(outcome.order_id));
        }
    }

    Ok(())
}

/// Validate a payment amount against a settlement's remaining balance
pub fn validate_payment_amount(amount_minor: i64) -> Result<(), ValidationError> {
    if amount_minor <= 0 {
        return Err(ValidationError::InvalidPaymentAmount(amount_minor));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::reconcile_request_v1::OrderOutcomeV1;
    use chrono::NaiveDate;

    fn valid_request() -> ReconcileRequestV1 {
        ReconcileRequestV1 {
            store_id: "store_1".to_string(),
            user_id: "user_1".to_string(),
            carrier_id: Uuid::new_v4(),
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            total_cash_collected_minor: 100_000,
            discrepancy_notes: None,
            orders: vec![OrderOutcomeV1 {
                order_id: Uuid::new_v4(),
                delivered: true,
            }],
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(validate_reconcile_request(&valid_request()).is_ok());
    }

    #[test]
    fn test_negative_cash_rejected() {
        let mut req = valid_request();
        req.total_cash_collected_minor = -1;
        assert_eq!(
            validate_reconcile_request(&req),
            Err(ValidationError::NegativeCashCollected(-1))
        );
    }

    #[test]
    fn test_zero_cash_allowed() {
        // An all-failed day legitimately collects nothing
        let mut req = valid_request();
        req.total_cash_collected_minor = 0;
        assert!(validate_reconcile_request(&req).is_ok());
    }

    #[test]
    fn test_empty_order_list_rejected() {
        let mut req = valid_request();
        req.orders.clear();
        assert_eq!(
            validate_reconcile_request(&req),
            Err(ValidationError::EmptyOrderList)
        );
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let mut req = valid_request();
        let dup = req.orders[0].order_id;
        req.orders.push(OrderOutcomeV1 {
            order_id: dup,
            delivered: false,
        });
        assert_eq!(
            validate_reconcile_request(&req),
            Err(ValidationError::DuplicateOrder(dup))
        );
    }

    #[test]
    fn test_blank_store_rejected() {
        let mut req = valid_request();
        req.store_id = "  ".to_string();
        assert_eq!(
            validate_reconcile_request(&req),
            Err(ValidationError::EmptyStoreId)
        );
    }

    #[test]
    fn test_payment_amount_bounds() {
        assert!(validate_payment_amount(1).is_ok());
        assert_eq!(
            validate_payment_amount(0),
            Err(ValidationError::InvalidPaymentAmount(0))
        );
        assert_eq!(
            validate_payment_amount(-5),
            Err(ValidationError::InvalidPaymentAmount(-5))
        );
    }
}
