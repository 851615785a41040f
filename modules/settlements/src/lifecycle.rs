//! Order lifecycle rules
//!
//! Pure transition logic for the fulfillment pipeline. The main chain is
//! `pending → contacted → confirmed → in_preparation → ready_to_ship →
//! shipped → in_transit → delivered`, with side branches for failed
//! attempts, incidents, cancellation, rejection, and returns.
//!
//! Nothing here touches the database; the transition service applies these
//! rules under an exclusive row lock on the order.

use serde::{Deserialize, Serialize};

/// Order status in the fulfillment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Contacted,
    Confirmed,
    InPreparation,
    ReadyToShip,
    Shipped,
    InTransit,
    Delivered,
    NotDelivered,
    Incident,
    Cancelled,
    Rejected,
    Returned,
}

impl OrderStatus {
    /// Position in the main fulfillment chain; None for side branches
    fn chain_rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Contacted => Some(1),
            OrderStatus::Confirmed => Some(2),
            OrderStatus::InPreparation => Some(3),
            OrderStatus::ReadyToShip => Some(4),
            OrderStatus::Shipped => Some(5),
            OrderStatus::InTransit => Some(6),
            OrderStatus::Delivered => Some(7),
            _ => None,
        }
    }

    /// Statuses in which the order's line items must hold decremented stock
    pub fn stock_affecting(self) -> bool {
        matches!(
            self,
            OrderStatus::ReadyToShip
                | OrderStatus::Shipped
                | OrderStatus::InTransit
                | OrderStatus::Delivered
        )
    }

    /// Early chain statuses a stock-decremented order may be reverted to
    pub fn pre_stock(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending
                | OrderStatus::Contacted
                | OrderStatus::Confirmed
                | OrderStatus::InPreparation
        )
    }

    /// Statuses in which the order is, or was, out with the courier. Only
    /// these are settleable: anything earlier never consumed a trip, and
    /// the terminal statuses already left the pipeline.
    pub fn dispatched(self) -> bool {
        matches!(
            self,
            OrderStatus::Shipped
                | OrderStatus::InTransit
                | OrderStatus::Delivered
                | OrderStatus::NotDelivered
                | OrderStatus::Incident
        )
    }

    /// Terminal statuses; `Delivered` becomes terminal once reconciled
    pub fn terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Returned
        )
    }
}

/// Whether a transition from `from` to `to` is permitted.
///
/// `reconciled` is whether the order already appears in a settlement; a
/// delivered, reconciled order is financially final and cannot move again.
pub fn transition_allowed(from: OrderStatus, to: OrderStatus, reconciled: bool) -> bool {
    if from == to {
        return false;
    }
    if from.terminal() {
        return false;
    }
    if from == OrderStatus::Delivered && reconciled {
        return false;
    }

    match to {
        // Cancellation and rejection are reachable from any live status
        OrderStatus::Cancelled | OrderStatus::Rejected => true,
        // Returns happen after the package reached (or bounced off) the customer
        OrderStatus::Returned => {
            matches!(from, OrderStatus::Delivered | OrderStatus::NotDelivered)
        }
        // A failed delivery attempt comes off the courier's route
        OrderStatus::NotDelivered => {
            matches!(from, OrderStatus::Shipped | OrderStatus::InTransit)
        }
        OrderStatus::Incident => matches!(
            from,
            OrderStatus::Shipped | OrderStatus::InTransit | OrderStatus::NotDelivered
        ),
        // Retry paths out of the side branches rejoin the chain
        OrderStatus::InTransit if from == OrderStatus::Incident => true,
        OrderStatus::Delivered if from == OrderStatus::Incident => true,
        OrderStatus::InTransit if from == OrderStatus::NotDelivered => true,
        OrderStatus::Delivered if from == OrderStatus::NotDelivered => true,
        // Within the main chain any forward or backward move is allowed;
        // backward moves out of stock-affecting statuses trigger a restore.
        _ => from.chain_rank().is_some() && to.chain_rank().is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_forward_chain_allowed() {
        assert!(transition_allowed(Pending, Contacted, false));
        assert!(transition_allowed(Contacted, Confirmed, false));
        assert!(transition_allowed(Confirmed, InPreparation, false));
        assert!(transition_allowed(InPreparation, ReadyToShip, false));
        assert!(transition_allowed(ReadyToShip, Shipped, false));
        assert!(transition_allowed(Shipped, InTransit, false));
        assert!(transition_allowed(InTransit, Delivered, false));
    }

    #[test]
    fn test_forward_skip_allowed() {
        assert!(transition_allowed(Pending, ReadyToShip, false));
        assert!(transition_allowed(Confirmed, Shipped, false));
    }

    #[test]
    fn test_backward_moves_allowed() {
        assert!(transition_allowed(ReadyToShip, InPreparation, false));
        assert!(transition_allowed(Shipped, Pending, false));
        assert!(transition_allowed(InTransit, Confirmed, false));
    }

    #[test]
    fn test_self_transition_rejected() {
        assert!(!transition_allowed(Pending, Pending, false));
        assert!(!transition_allowed(Delivered, Delivered, false));
    }

    #[test]
    fn test_terminal_statuses_frozen() {
        assert!(!transition_allowed(Cancelled, Pending, false));
        assert!(!transition_allowed(Rejected, Confirmed, false));
        assert!(!transition_allowed(Returned, Delivered, false));
    }

    #[test]
    fn test_reconciled_delivery_is_final() {
        assert!(transition_allowed(Delivered, Returned, false));
        assert!(!transition_allowed(Delivered, Returned, true));
        assert!(!transition_allowed(Delivered, Pending, true));
    }

    #[test]
    fn test_cancel_reachable_from_any_live_status() {
        for from in [
            Pending, Contacted, Confirmed, InPreparation, ReadyToShip, Shipped, InTransit,
            Delivered, NotDelivered, Incident,
        ] {
            assert!(transition_allowed(from, Cancelled, false), "{:?}", from);
        }
    }

    #[test]
    fn test_not_delivered_only_from_courier_route() {
        assert!(transition_allowed(Shipped, NotDelivered, false));
        assert!(transition_allowed(InTransit, NotDelivered, false));
        assert!(!transition_allowed(Pending, NotDelivered, false));
        assert!(!transition_allowed(Confirmed, NotDelivered, false));
    }

    #[test]
    fn test_incident_retry_paths() {
        assert!(transition_allowed(InTransit, Incident, false));
        assert!(transition_allowed(Incident, InTransit, false));
        assert!(transition_allowed(Incident, Delivered, false));
        assert!(transition_allowed(Incident, Cancelled, false));
        assert!(!transition_allowed(Incident, ReadyToShip, false));
    }

    #[test]
    fn test_returns_only_after_delivery_attempt() {
        assert!(transition_allowed(Delivered, Returned, false));
        assert!(transition_allowed(NotDelivered, Returned, false));
        assert!(!transition_allowed(InTransit, Returned, false));
        assert!(!transition_allowed(Pending, Returned, false));
    }

    #[test]
    fn test_stock_affecting_set() {
        assert!(ReadyToShip.stock_affecting());
        assert!(Shipped.stock_affecting());
        assert!(InTransit.stock_affecting());
        assert!(Delivered.stock_affecting());
        assert!(!Pending.stock_affecting());
        assert!(!NotDelivered.stock_affecting());
        assert!(!Incident.stock_affecting());
        assert!(!Cancelled.stock_affecting());
    }

    #[test]
    fn test_dispatched_set() {
        assert!(Shipped.dispatched());
        assert!(InTransit.dispatched());
        assert!(Delivered.dispatched());
        assert!(NotDelivered.dispatched());
        assert!(Incident.dispatched());
        // Still at the warehouse, or already out of the pipeline
        assert!(!Pending.dispatched());
        assert!(!Confirmed.dispatched());
        assert!(!ReadyToShip.dispatched());
        assert!(!Cancelled.dispatched());
        assert!(!Returned.dispatched());
    }

    #[test]
    fn test_serde_wire_format() {
        assert_eq!(
            serde_json::to_string(&ReadyToShip).unwrap(),
            r#""ready_to_ship""#
        );
        let parsed: OrderStatus = serde_json::from_str(r#""not_delivered""#).unwrap();
        assert_eq!(parsed, NotDelivered);
    }
}
