pub mod carrier_repo;
pub mod inventory_repo;
pub mod order_repo;
pub mod settlement_repo;
