pub mod inventory_service;
pub mod order_transition_service;
pub mod payment_service;
pub mod rate_resolver;
pub mod reconciliation_service;
pub mod settlement_code;
