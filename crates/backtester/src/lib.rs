// In crates/backtester/src/lib.rs

pub mod error;
pub mod logger;
pub mod types;

use chrono::{DateTime, NaiveDate};
use core_types::{Kline, Symbol};
use engine::Coordinator;
use rust_decimal::Decimal;
use strategies::indicators::moving_average;
use strategies::{Action, StrategyConfig};

pub use error::{Error, Result};
pub use logger::TradeLogger;
pub use types::{BacktestReport, BacktestTrade, EquityPoint};

/// Replays daily candles of one symbol through the DFA coordinator with a simulated cash balance.
pub struct Backtester {
    symbol: Symbol,
    coordinator: Coordinator,
    moving_average_period: usize,
    initial_cash: Decimal,
    cash: Decimal,
    logger: TradeLogger,
}

impl Backtester {
    pub fn new(symbol: Symbol, config: StrategyConfig, moving_average_period: usize, initial_cash: Decimal) -> Self {
        Self {
            coordinator: Coordinator::new(vec![(symbol.clone(), config)]),
            symbol,
            moving_average_period: moving_average_period.max(1),
            initial_cash,
            cash: initial_cash,
            logger: TradeLogger::new(),
        }
    }

    /// Runs the replay. Each day after the warm-up window trades at its close,
    /// against the mean of the previous `moving_average_period` closes.
    pub fn run(mut self, klines: &[Kline]) -> Result<BacktestReport> {
        let period = self.moving_average_period;
        if klines.len() <= period {
            return Err(Error::NotEnoughHistory {
                available: klines.len(),
                required: period,
            });
        }

        tracing::info!(
            symbol = %self.symbol,
            candles = klines.len(),
            period,
            initial_cash = %self.initial_cash,
            "Starting backtest."
        );

        let start_date = candle_date(&klines[period])?;
        let mut end_date = start_date;
        let mut last_price = Decimal::ZERO;

        for i in period..klines.len() {
            let date = candle_date(&klines[i])?;
            let price = klines[i].close;
            let Some(ma) = moving_average(&klines[i - period..i], period) else {
                continue;
            };

            let outcome = self
                .coordinator
                .evaluate_tick(&self.symbol, price, ma, date, Some(self.cash))?;

            self.apply(date, &outcome.profit_taking);
            self.apply(date, &outcome.investment);

            let holdings = self.coordinator.state(&self.symbol)?.current_value(price);
            self.logger.record_equity(date, self.cash + holdings);

            end_date = date;
            last_price = price;
        }

        let final_state = self.coordinator.state(&self.symbol)?.clone();
        let final_status = self.coordinator.portfolio_status(&self.symbol, last_price)?;
        let max_drawdown = self.logger.max_drawdown();
        let TradeLogger { trades, equity_curve } = self.logger;

        let report = BacktestReport {
            symbol: self.symbol,
            start_date,
            end_date,
            initial_cash: self.initial_cash,
            final_cash: self.cash,
            buys: final_state.investment_count as usize,
            sells: final_state.profit_history.len(),
            trades,
            equity_curve,
            max_drawdown,
            final_state,
            final_status,
        };

        tracing::info!(
            symbol = %report.symbol,
            buys = report.buys,
            sells = report.sells,
            final_cash = %report.final_cash.round_dp(2),
            final_equity = %report.final_equity().round_dp(2),
            max_drawdown = %report.max_drawdown.round_dp(2),
            "Backtest finished."
        );
        Ok(report)
    }

    fn apply(&mut self, date: NaiveDate, action: &Action) {
        match action {
            Action::Buy(order) => self.cash -= order.amount,
            Action::Sell(order) => self.cash += order.amount,
            Action::Skip { .. } => return,
        }
        self.logger.record_action(date, action);
    }
}

fn candle_date(kline: &Kline) -> Result<NaiveDate> {
    DateTime::from_timestamp_millis(kline.open_time)
        .map(|dt| dt.date_naive())
        .ok_or(Error::BadTimestamp(kline.open_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Side;
    use rust_decimal_macros::dec;

    const DAY_MS: i64 = 86_400_000;
    // 2024-01-01T00:00:00Z
    const START_MS: i64 = 1_704_067_200_000;

    fn klines(closes: &[Decimal]) -> Vec<Kline> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let open_time = START_MS + i as i64 * DAY_MS;
                Kline {
                    open_time,
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: dec!(1),
                    close_time: open_time + DAY_MS - 1,
                }
            })
            .collect()
    }

    #[test]
    fn buys_only_on_interval_days() {
        let series = klines(&[dec!(100); 60]);
        let report = Backtester::new(Symbol("ETHUSDT".into()), StrategyConfig::new(dec!(50)), 10, dec!(10000))
            .run(&series)
            .unwrap();

        // Days 10, 24, 38 and 52 of the series.
        assert_eq!(report.buys, 4);
        let dates: Vec<_> = report.trades.iter().map(|t| t.date).collect();
        for pair in dates.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 14);
        }
        assert_eq!(report.start_date, NaiveDate::from_ymd_opt(2024, 1, 11).unwrap());
        assert_eq!(report.equity_curve.len(), 50);
        // Flat price: every buy is 1.2x base at deviation 0.
        assert_eq!(report.final_cash, dec!(10000) - dec!(60) * dec!(4));
        assert_eq!(report.final_equity(), dec!(10000));
    }

    #[test]
    fn rally_takes_profit_and_credits_cash() {
        let mut closes = vec![dec!(100); 20];
        closes.extend((1..=40).map(|i| dec!(100) + Decimal::from(i) * dec!(5)));
        let report = Backtester::new(Symbol("SOLUSDT".into()), StrategyConfig::new(dec!(100)), 10, dec!(1000))
            .run(&klines(&closes))
            .unwrap();

        assert!(report.sells >= 1);
        let sell = report.trades.iter().find(|t| t.side == Side::Sell).unwrap();
        assert!(sell.detail > Decimal::ZERO);

        let bought: Decimal = report.trades.iter().filter(|t| t.side == Side::Buy).map(|t| t.amount).sum();
        let sold: Decimal = report.trades.iter().filter(|t| t.side == Side::Sell).map(|t| t.amount).sum();
        assert_eq!(report.final_cash, dec!(1000) - bought + sold);
    }

    #[test]
    fn cash_limits_buys() {
        let series = klines(&[dec!(100); 40]);
        let report = Backtester::new(Symbol("SUIUSDT".into()), StrategyConfig::new(dec!(50)), 5, dec!(70))
            .run(&series)
            .unwrap();

        assert!(report.final_cash >= Decimal::ZERO);
        assert_eq!(report.trades[0].amount, dec!(60));
        assert_eq!(report.trades[1].amount, dec!(10));
    }

    #[test]
    fn tiny_price_never_overdraws_cash() {
        let series = klines(&[dec!(0.00015); 40]);
        let report = Backtester::new(Symbol("PEPEUSDT".into()), StrategyConfig::new(dec!(28)), 5, dec!(10))
            .run(&series)
            .unwrap();

        assert_eq!(report.buys, 1);
        assert!(report.final_cash >= Decimal::ZERO);
        assert!(report.final_cash < dec!(0.0001));
    }

    #[test]
    fn short_history_is_an_error() {
        let series = klines(&[dec!(100); 5]);
        let result = Backtester::new(Symbol("ETHUSDT".into()), StrategyConfig::new(dec!(50)), 10, dec!(100)).run(&series);
        assert!(matches!(result, Err(Error::NotEnoughHistory { available: 5, .. })));
    }
}
