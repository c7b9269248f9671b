//! Revenue aggregation across online orders and manual in-person sales.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::money;

/// Trailing window length for the "recent revenue" figure.
pub const REVENUE_WINDOW_DAYS: i64 = 30;

/// A paid online order, reduced to what the report needs.
#[derive(Debug, Clone, Copy)]
pub struct PaidOrder {
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// A manual sale: quantity at its own unit price, independent of any order.
#[derive(Debug, Clone, Copy)]
pub struct RecordedSale {
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevenueSummary {
    pub online_cents: i64,
    pub manual_cents: i64,
    pub total_cents: i64,
    pub window_online_cents: i64,
    pub window_manual_cents: i64,
    pub window_total_cents: i64,
}

/// Sums both revenue sources in integer cents, all-time and over the
/// trailing 30-day window ending at `now`.
///
/// A record stamped exactly at the window boundary is included; anything
/// strictly older is not. Recomputed from scratch on every call.
#[must_use]
pub fn summarize(orders: &[PaidOrder], sales: &[RecordedSale], now: DateTime<Utc>) -> RevenueSummary {
    let cutoff = now - Duration::days(REVENUE_WINDOW_DAYS);

    let online_cents: i64 = orders.iter().map(|o| o.total_cents).sum();
    let manual_cents: i64 = sales
        .iter()
        .map(|s| money::line_total(s.unit_price_cents, s.quantity))
        .sum();

    let window_online_cents: i64 = orders
        .iter()
        .filter(|o| o.created_at >= cutoff)
        .map(|o| o.total_cents)
        .sum();
    let window_manual_cents: i64 = sales
        .iter()
        .filter(|s| s.created_at >= cutoff)
        .map(|s| money::line_total(s.unit_price_cents, s.quantity))
        .sum();

    RevenueSummary {
        online_cents,
        manual_cents,
        total_cents: online_cents + manual_cents,
        window_online_cents,
        window_manual_cents,
        window_total_cents: window_online_cents + window_manual_cents,
    }
}
