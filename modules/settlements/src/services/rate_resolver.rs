//! Carrier fee resolution
//!
//! Given a carrier's rate table and an order's destination, picks the fee
//! to charge for the delivery. Strict priority with a total order at every
//! tier, so identical inputs always produce the identical fee:
//!
//! 1. active city-scoped rate matching the shipping city (trimmed,
//!    case-insensitive);
//! 2. active zone-scoped rate matching the delivery zone (case-insensitive);
//! 3. fallback across all active zone rates: zones literally named
//!    `default`, `otros`, `interior` or `general` first (in that priority),
//!    then ascending fee, then zone name — first wins;
//! 4. zero.
//!
//! Pure over an already-fetched rate table; the reconciliation engine loads
//! the rates once per settlement and resolves every order against them.

use crate::repos::carrier_repo::{CarrierRate, RateScope};

/// Generic zone names recognized as catch-alls, highest priority first.
/// Matched exactly (after trim): a descriptive zone like "Interior" is a
/// real zone, not a catch-all.
const FALLBACK_ZONES: [&str; 4] = ["default", "otros", "interior", "general"];

fn eq_normalized(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn fallback_rank(zone_name: &str) -> usize {
    FALLBACK_ZONES
        .iter()
        .position(|z| zone_name.trim() == *z)
        .unwrap_or(FALLBACK_ZONES.len())
}

/// Resolve the delivery fee for a destination from a carrier's active rates.
///
/// Pure; the deterministic tie-break in the fallback tier is load-bearing:
/// two equally-unscoped zone rates must resolve the same way on every call.
pub fn resolve_fee(rates: &[CarrierRate], shipping_city: &str, delivery_zone: Option<&str>) -> i64 {
    // Tier 1: exact city rate
    if let Some(rate) = rates
        .iter()
        .filter(|r| r.scope == RateScope::City && eq_normalized(&r.scope_value, shipping_city))
        .min_by(|a, b| {
            (a.fee_minor, a.scope_value.as_str()).cmp(&(b.fee_minor, b.scope_value.as_str()))
        })
    {
        return rate.fee_minor;
    }

    // Tier 2: exact zone rate
    if let Some(zone) = delivery_zone {
        if let Some(rate) = rates
            .iter()
            .filter(|r| r.scope == RateScope::Zone && eq_normalized(&r.scope_value, zone))
            .min_by(|a, b| {
                (a.fee_minor, a.scope_value.as_str()).cmp(&(b.fee_minor, b.scope_value.as_str()))
            })
        {
            return rate.fee_minor;
        }
    }

    // Tier 3: totally-ordered fallback over all active zone rates
    if let Some(rate) = rates
        .iter()
        .filter(|r| r.scope == RateScope::Zone)
        .min_by(|a, b| {
            (fallback_rank(&a.scope_value), a.fee_minor, a.scope_value.as_str())
                .cmp(&(fallback_rank(&b.scope_value), b.fee_minor, b.scope_value.as_str()))
        })
    {
        return rate.fee_minor;
    }

    // Tier 4: carrier has no usable rate at all
    0
}
