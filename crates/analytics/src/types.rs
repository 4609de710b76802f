// In crates/analytics/src/types.rs

use chrono::NaiveDate;
use core_types::Symbol;
use rust_decimal::Decimal;
use serde::Serialize;

/// A read-only snapshot of one symbol's position at a given price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolStatus {
    pub symbol: Symbol,
    pub investment_count: u64,
    pub total_shares: Decimal,
    /// Cost basis of the shares still held.
    pub total_invested: Decimal,
    pub current_value: Decimal,
    /// Floating return on the held cost basis, in percent.
    pub current_return: Decimal,
    /// Lifetime sum of buy amounts.
    pub total_investment: Decimal,
    pub total_sell_amount: Decimal,
    /// Current value plus everything ever received from sells.
    pub total_assets: Decimal,
    /// Lifetime return of `total_assets` against `total_investment`, in percent.
    pub total_return: Decimal,
    pub last_investment_date: Option<NaiveDate>,
}

/// Whole-portfolio aggregate across every symbol with a known price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub symbols: Vec<SymbolStatus>,
    /// Sum of `current_value + total_sell_amount` over priced symbols.
    pub total_assets: Decimal,
    pub total_investment: Decimal,
    pub total_return: Decimal,
}
