use crate::types::{PortfolioSummary, SymbolStatus};
use core_types::Symbol;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use strategies::SymbolState;

/// Computes status reports from strategy state. Holds no state of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the status of a single symbol at `current_price`.
    pub fn symbol_status(&self, symbol: &Symbol, state: &SymbolState, current_price: Decimal) -> SymbolStatus {
        let current_value = state.current_value(current_price);
        let total_investment = state.total_investment();
        let total_assets = current_value + state.total_sell_amount;

        SymbolStatus {
            symbol: symbol.clone(),
            investment_count: state.investment_count,
            total_shares: state.total_shares,
            total_invested: state.total_invested,
            current_value,
            current_return: state.current_return(current_price),
            total_investment,
            total_sell_amount: state.total_sell_amount,
            total_assets,
            total_return: percent_change(total_assets, total_investment),
            last_investment_date: state.last_investment_date,
        }
    }

    /// Aggregates every symbol that has a price in `current_prices`. Unpriced symbols are left out.
    pub fn portfolio_summary(
        &self,
        states: &BTreeMap<Symbol, SymbolState>,
        current_prices: &HashMap<Symbol, Decimal>,
    ) -> PortfolioSummary {
        let symbols: Vec<SymbolStatus> = states
            .iter()
            .filter_map(|(symbol, state)| {
                current_prices
                    .get(symbol)
                    .map(|price| self.symbol_status(symbol, state, *price))
            })
            .collect();

        let total_assets: Decimal = symbols.iter().map(|s| s.total_assets).sum();
        let total_investment: Decimal = symbols.iter().map(|s| s.total_investment).sum();

        PortfolioSummary {
            total_return: percent_change(total_assets, total_investment),
            total_assets,
            total_investment,
            symbols,
        }
    }
}

fn percent_change(value: Decimal, base: Decimal) -> Decimal {
    if base > Decimal::ZERO {
        (value - base) / base * dec!(100)
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use strategies::{InvestmentRecord, StrategyConfig, evaluate_investment, evaluate_profit_taking};

    fn symbol(s: &str) -> Symbol {
        Symbol(s.to_string())
    }

    fn record(amount: Decimal, shares: Decimal) -> InvestmentRecord {
        InvestmentRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            price: amount / shares,
            moving_average: amount / shares,
            deviation: Decimal::ZERO,
            multiplier: dec!(1),
            amount,
            shares,
        }
    }

    #[test]
    fn status_of_empty_state_is_all_zero() {
        let status = AnalyticsEngine::new().symbol_status(&symbol("ETHUSDT"), &SymbolState::new(), dec!(3000));
        assert_eq!(status.current_value, Decimal::ZERO);
        assert_eq!(status.current_return, Decimal::ZERO);
        assert_eq!(status.total_return, Decimal::ZERO);
        assert_eq!(status.last_investment_date, None);
    }

    #[test]
    fn lifetime_return_counts_sell_proceeds() {
        let state = SymbolState {
            investment_count: 2,
            total_shares: dec!(5),
            total_invested: dec!(250),
            total_sell_amount: dec!(450),
            investment_history: vec![record(dec!(300), dec!(6)), record(dec!(200), dec!(4))],
            ..Default::default()
        };

        let status = AnalyticsEngine::new().symbol_status(&symbol("SOLUSDT"), &state, dec!(90));

        assert_eq!(status.current_value, dec!(450));
        assert_eq!(status.current_return, dec!(80));
        assert_eq!(status.total_investment, dec!(500));
        assert_eq!(status.total_assets, dec!(900));
        assert_eq!(status.total_return, dec!(80));
    }

    #[test]
    fn summary_skips_unpriced_symbols() {
        let config = StrategyConfig::new(dec!(100));
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        let mut eth = SymbolState::new();
        evaluate_investment(&mut eth, &config, dec!(100), dec!(100), day, None);
        let mut sol = SymbolState::new();
        evaluate_investment(&mut sol, &config, dec!(50), dec!(50), day, None);
        evaluate_profit_taking(&mut sol, &config, dec!(100), day);

        let mut states = BTreeMap::new();
        states.insert(symbol("ETHUSDT"), eth);
        states.insert(symbol("SOLUSDT"), sol);
        states.insert(symbol("SUIUSDT"), SymbolState::new());

        let mut prices = HashMap::new();
        prices.insert(symbol("ETHUSDT"), dec!(110));
        prices.insert(symbol("SOLUSDT"), dec!(100));

        let summary = AnalyticsEngine::new().portfolio_summary(&states, &prices);

        assert_eq!(summary.symbols.len(), 2);
        // ETH: 1.2 shares @110 = 132 on 120 invested.
        // SOL: 2.4 shares bought for 120, half sold at 100 (120 received), 1.2 left @100.
        assert_eq!(summary.total_investment, dec!(240));
        assert_eq!(summary.total_assets, dec!(372));
        assert_eq!(summary.total_return, dec!(55));
    }
}
