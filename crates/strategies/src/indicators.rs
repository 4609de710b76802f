// In crates/strategies/src/indicators.rs

use core_types::Kline;
use rust_decimal::Decimal;

/// Simple moving average of the closes over the last `period` klines.
///
/// When fewer than `period` klines are available the average is taken over
/// what there is, with a warning. Returns `None` for an empty slice.
pub fn moving_average(klines: &[Kline], period: usize) -> Option<Decimal> {
    if klines.is_empty() || period == 0 {
        return None;
    }

    let window = &klines[klines.len().saturating_sub(period)..];
    if window.len() < period {
        tracing::warn!(
            available = window.len(),
            period,
            "Not enough history for the full moving average window."
        );
    }

    let sum: Decimal = window.iter().map(|k| k.close).sum();
    Some(sum / Decimal::from(window.len()))
}
