//! Number and time formatting shared by every view.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round the exact binary value of `value` to `decimals` places, exact halves away from zero.
/// `None` for values a `Decimal` cannot hold (non-finite or out of range).
fn round_exact(value: f64, decimals: u32) -> Option<Decimal> {
    let exact = Decimal::from_f64_retain(value)?;
    let mut rounded = exact.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimals);
    Some(rounded)
}

/// Same rounding as `fixed`, as a number.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    fixed(value, decimals).parse().unwrap_or(value)
}

/// Fixed-point rendering matching a browser's `toFixed`: `0.015` is stored just below the
/// half and becomes `0.01`, while the exact half `12.5` becomes `13`.
pub fn fixed(value: f64, decimals: u32) -> String {
    match round_exact(value, decimals) {
        Some(d) => d.to_string(),
        None => format!("{:.*}", decimals as usize, value),
    }
}

/// `$5.1234`
pub fn usd_price(value: f64) -> String {
    format!("${}", fixed(value, 4))
}

/// `4.57 bps`
pub fn bps(value: f64) -> String {
    format!("{} bps", fixed(value, 2))
}

/// Quote-currency units expressed in thousands.
pub fn in_thousands(value: f64, decimals: u32) -> f64 {
    round_to(value / 1000.0, decimals)
}

/// `$12k`
pub fn usd_thousands(value: f64) -> String {
    format!("${}k", fixed(value / 1000.0, 0))
}

/// `$12.3k`, used in chart tooltips.
pub fn usd_thousands_1dp(value_k: f64) -> String {
    format!("${}k", fixed(value_k, 1))
}

/// Axis label, e.g. `03:45 PM`.
pub fn time_label(ts: &DateTime<Utc>, tz: &FixedOffset) -> String {
    ts.with_timezone(tz).format("%I:%M %p").to_string()
}

/// Tooltip/table label, e.g. `5/1/2024, 3:45:12 PM`.
pub fn full_time(ts: &DateTime<Utc>, tz: &FixedOffset) -> String {
    ts.with_timezone(tz).format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}
