pub mod order_transition_v1;
pub mod reconcile_request_v1;
pub mod settlement_payment_v1;
