// In crates/backtester/src/types.rs

use analytics::SymbolStatus;
use chrono::NaiveDate;
use core_types::{Side, Symbol};
use rust_decimal::Decimal;
use strategies::SymbolState;

/// A simulated fill.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestTrade {
    pub date: NaiveDate,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Quote amount paid (buy) or received (sell).
    pub amount: Decimal,
    /// Multiplier for buys, realized profit for sells.
    pub detail: Decimal,
}

/// Cash plus holdings at one day's close.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub symbol: Symbol,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: Decimal,
    pub final_cash: Decimal,
    pub buys: usize,
    pub sells: usize,
    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub max_drawdown: Decimal,
    pub final_state: SymbolState,
    /// Status at the last close.
    pub final_status: SymbolStatus,
}

impl BacktestReport {
    /// Cash plus holdings at the last close.
    pub fn final_equity(&self) -> Decimal {
        self.final_cash + self.final_status.current_value
    }

    /// Percent change of equity over the run.
    pub fn equity_return(&self) -> Decimal {
        if self.initial_cash.is_zero() {
            return Decimal::ZERO;
        }
        (self.final_equity() - self.initial_cash) / self.initial_cash * Decimal::ONE_HUNDRED
    }
}
