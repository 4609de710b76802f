// In crates/backtester/src/logger.rs

use crate::types::{BacktestTrade, EquityPoint};
use chrono::NaiveDate;
use core_types::Side;
use rust_decimal::Decimal;
use strategies::Action;

/// Records fills and the daily equity curve during a backtest.
#[derive(Debug, Default)]
pub struct TradeLogger {
    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl TradeLogger {
    /// Creates a new, empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a point in the equity curve.
    pub fn record_equity(&mut self, date: NaiveDate, value: Decimal) {
        self.equity_curve.push(EquityPoint { date, value });
    }

    /// Records the fill implied by `action`. Skips are ignored.
    pub fn record_action(&mut self, date: NaiveDate, action: &Action) {
        let trade = match action {
            Action::Skip { .. } => return,
            Action::Buy(order) => BacktestTrade {
                date,
                side: Side::Buy,
                price: order.price,
                size: order.size,
                amount: order.amount,
                detail: order.multiplier,
            },
            Action::Sell(order) => BacktestTrade {
                date,
                side: Side::Sell,
                price: order.price,
                size: order.size,
                amount: order.amount,
                detail: order.profit,
            },
        };
        tracing::debug!(date = %date, side = %trade.side, price = %trade.price, size = %trade.size, "Backtest fill.");
        self.trades.push(trade);
    }

    /// Largest peak-to-trough fall of the equity curve, in percent of the peak.
    pub fn max_drawdown(&self) -> Decimal {
        let mut peak = Decimal::ZERO;
        let mut worst = Decimal::ZERO;
        for point in &self.equity_curve {
            peak = peak.max(point.value);
            if peak > Decimal::ZERO {
                worst = worst.max((peak - point.value) / peak * Decimal::ONE_HUNDRED);
            }
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn drawdown_tracks_running_peak() {
        let mut logger = TradeLogger::new();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for value in [dec!(100), dec!(120), dec!(90), dec!(130), dec!(117)] {
            logger.record_equity(day, value);
        }
        assert_eq!(logger.max_drawdown(), dec!(25));
    }
}
