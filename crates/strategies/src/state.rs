// In crates/strategies/src/state.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// One completed buy.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentRecord {
    pub date: NaiveDate,
    pub price: Decimal,
    pub moving_average: Decimal,
    /// Deviation from the moving average, in percent.
    pub deviation: Decimal,
    pub multiplier: Decimal,
    /// Quote amount actually spent (`shares * price`).
    pub amount: Decimal,
    pub shares: Decimal,
}

/// One completed profit-taking sell.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfitRecord {
    pub date: NaiveDate,
    pub price: Decimal,
    /// Floating return that triggered the sell, in percent.
    pub return_percent: Decimal,
    pub shares_sold: Decimal,
    pub amount_received: Decimal,
    /// Cost basis removed with the sold shares.
    pub cost_of_sold: Decimal,
    pub profit: Decimal,
}

/// The accumulated position and history of a single tracked symbol.
///
/// Only the functions in [`crate::dfa`] mutate this; everything else reads it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolState {
    pub investment_count: u64,
    pub last_investment_date: Option<NaiveDate>,
    pub last_profit_taking_date: Option<NaiveDate>,
    /// Cost basis of the shares currently held.
    pub total_invested: Decimal,
    pub total_shares: Decimal,
    /// Lifetime proceeds from sells.
    pub total_sell_amount: Decimal,
    pub investment_history: Vec<InvestmentRecord>,
    pub profit_history: Vec<ProfitRecord>,
}

impl SymbolState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Market value of the current holdings.
    pub fn current_value(&self, current_price: Decimal) -> Decimal {
        self.total_shares.saturating_mul(current_price)
    }

    /// Floating return on the held cost basis, in percent. Zero with no cost basis,
    /// `Decimal::MAX` when the ratio does not fit.
    pub fn current_return(&self, current_price: Decimal) -> Decimal {
        if self.total_invested > Decimal::ZERO {
            self.current_value(current_price)
                .saturating_sub(self.total_invested)
                .checked_div(self.total_invested)
                .and_then(|ratio| ratio.checked_mul(dec!(100)))
                .unwrap_or(Decimal::MAX)
        } else {
            Decimal::ZERO
        }
    }

    /// Sum of every buy ever made, including shares since sold.
    pub fn total_investment(&self) -> Decimal {
        self.investment_history.iter().map(|r| r.amount).sum()
    }

    pub fn has_position(&self) -> bool {
        self.total_shares > Decimal::ZERO
    }
}
