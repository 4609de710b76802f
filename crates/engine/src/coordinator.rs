// In crates/engine/src/coordinator.rs

use crate::{Error, Result};
use analytics::{AnalyticsEngine, PortfolioSummary, SymbolStatus};
use chrono::NaiveDate;
use core_types::Symbol;
use rust_decimal::Decimal;
use state_store::PersistedState;
use std::collections::{BTreeMap, HashMap};
use strategies::{Action, Fill, SkipReason, StrategyConfig, SymbolState};

/// The two decisions made for one symbol in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub profit_taking: Action,
    pub investment: Action,
}

/// Runs the DFA decision logic for several independently tracked symbols.
///
/// Every symbol has its own config and state; evaluating one never reads or
/// writes another. The coordinator does no I/O.
#[derive(Debug, Clone)]
pub struct Coordinator {
    /// Symbols in configuration order.
    symbols: Vec<Symbol>,
    configs: HashMap<Symbol, StrategyConfig>,
    states: BTreeMap<Symbol, SymbolState>,
    analytics: AnalyticsEngine,
}

impl Coordinator {
    /// A coordinator with fresh state for every configured symbol.
    pub fn new(configs: Vec<(Symbol, StrategyConfig)>) -> Self {
        Self::with_states(configs, BTreeMap::new())
    }

    /// A coordinator seeded with previously saved states.
    ///
    /// States of symbols that are no longer configured are dropped; configured
    /// symbols without a saved state start fresh.
    pub fn with_states(configs: Vec<(Symbol, StrategyConfig)>, mut saved: BTreeMap<Symbol, SymbolState>) -> Self {
        let mut symbols = Vec::with_capacity(configs.len());
        let mut config_map = HashMap::with_capacity(configs.len());
        let mut states = BTreeMap::new();

        for (symbol, config) in configs {
            if config_map.contains_key(&symbol) {
                tracing::warn!(symbol = %symbol, "Symbol configured twice, keeping the first config.");
                continue;
            }
            let state = saved.remove(&symbol).unwrap_or_default();
            states.insert(symbol.clone(), state);
            config_map.insert(symbol.clone(), config);
            symbols.push(symbol);
        }

        for dropped in saved.keys() {
            tracing::info!(symbol = %dropped, "Ignoring saved state of a symbol that is no longer configured.");
        }

        Self {
            symbols,
            configs: config_map,
            states,
            analytics: AnalyticsEngine::new(),
        }
    }

    /// Rebuilds a coordinator from the persisted form.
    pub fn from_persistable(configs: Vec<(Symbol, StrategyConfig)>, persisted: PersistedState) -> Self {
        let tracked: Vec<Symbol> = configs.iter().map(|(symbol, _)| symbol.clone()).collect();
        let states = state_store::from_persistable(persisted, &tracked);
        Self::with_states(configs, states)
    }

    pub fn to_persistable(&self) -> PersistedState {
        state_store::to_persistable(&self.states)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn states(&self) -> &BTreeMap<Symbol, SymbolState> {
        &self.states
    }

    pub fn state(&self, symbol: &Symbol) -> Result<&SymbolState> {
        self.states
            .get(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.clone()))
    }

    pub fn config(&self, symbol: &Symbol) -> Result<&StrategyConfig> {
        self.configs
            .get(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.clone()))
    }

    pub fn should_invest_today(&self, symbol: &Symbol, current_date: NaiveDate) -> Result<bool> {
        Ok(strategies::should_invest_today(
            self.state(symbol)?,
            self.config(symbol)?,
            current_date,
        ))
    }

    pub fn days_until_next_investment(&self, symbol: &Symbol, current_date: NaiveDate) -> Result<i64> {
        Ok(strategies::days_until_next_investment(
            self.state(symbol)?,
            self.config(symbol)?,
            current_date,
        ))
    }

    pub fn evaluate_profit_taking(
        &mut self,
        symbol: &Symbol,
        current_price: Decimal,
        current_date: NaiveDate,
    ) -> Result<Action> {
        let (state, config) = self.entry(symbol)?;
        let action = strategies::evaluate_profit_taking(state, config, current_price, current_date);
        log_action(symbol, "profit_taking", &action);
        Ok(action)
    }

    /// Gated investment: skips with `NotInvestmentDay` while the interval has not elapsed.
    pub fn evaluate_investment(
        &mut self,
        symbol: &Symbol,
        current_price: Decimal,
        moving_average: Decimal,
        current_date: NaiveDate,
        available_cash: Option<Decimal>,
    ) -> Result<Action> {
        let (state, config) = self.entry(symbol)?;

        let days_remaining = strategies::days_until_next_investment(state, config, current_date);
        let action = if days_remaining > 0 {
            Action::skip(SkipReason::NotInvestmentDay { days_remaining })
        } else {
            strategies::evaluate_investment(
                state,
                config,
                current_price,
                moving_average,
                current_date,
                available_cash,
            )
        };
        log_action(symbol, "investment", &action);
        Ok(action)
    }

    /// Profit-taking first, then the gated investment, for one symbol.
    pub fn evaluate_tick(
        &mut self,
        symbol: &Symbol,
        current_price: Decimal,
        moving_average: Decimal,
        current_date: NaiveDate,
        available_cash: Option<Decimal>,
    ) -> Result<TickOutcome> {
        let profit_taking = self.evaluate_profit_taking(symbol, current_price, current_date)?;
        let investment =
            self.evaluate_investment(symbol, current_price, moving_average, current_date, available_cash)?;
        Ok(TickOutcome { profit_taking, investment })
    }

    /// Replaces a symbol's state, e.g. to undo a decision whose order failed.
    pub fn restore(&mut self, symbol: &Symbol, state: SymbolState) -> Result<()> {
        let slot = self
            .states
            .get_mut(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.clone()))?;
        *slot = state;
        Ok(())
    }

    /// Re-books a decided trade with what was actually filled.
    ///
    /// `snapshot` is the symbol's state from before the decision; the decided
    /// trade is dropped and `fill` is booked on top of it instead. Skips are
    /// returned unchanged.
    pub fn record_fill(
        &mut self,
        symbol: &Symbol,
        snapshot: SymbolState,
        decided: &Action,
        fill: Fill,
        current_date: NaiveDate,
    ) -> Result<Action> {
        let (state, _) = self.entry(symbol)?;
        let action = match decided {
            Action::Skip { .. } => return Ok(*decided),
            Action::Buy(order) => {
                *state = snapshot;
                Action::Buy(strategies::book_buy(
                    state,
                    current_date,
                    fill,
                    order.moving_average,
                    order.deviation,
                    order.multiplier,
                ))
            }
            Action::Sell(order) => {
                *state = snapshot;
                Action::Sell(strategies::book_sell(state, current_date, fill, order.current_return))
            }
        };
        log_action(symbol, "fill", &action);
        Ok(action)
    }

    pub fn portfolio_status(&self, symbol: &Symbol, current_price: Decimal) -> Result<SymbolStatus> {
        Ok(self
            .analytics
            .symbol_status(symbol, self.state(symbol)?, current_price))
    }

    /// Whole-portfolio aggregate over the symbols present in `current_prices`.
    pub fn portfolio_summary(&self, current_prices: &HashMap<Symbol, Decimal>) -> PortfolioSummary {
        self.analytics.portfolio_summary(&self.states, current_prices)
    }

    fn entry(&mut self, symbol: &Symbol) -> Result<(&mut SymbolState, &StrategyConfig)> {
        let config = self
            .configs
            .get(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.clone()))?;
        let state = self
            .states
            .get_mut(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.clone()))?;
        Ok((state, config))
    }
}

fn log_action(symbol: &Symbol, stage: &'static str, action: &Action) {
    match action {
        Action::Skip { reason } => {
            tracing::info!(symbol = %symbol, stage, reason = %reason, "Skipped.");
        }
        Action::Buy(order) => {
            tracing::info!(
                symbol = %symbol,
                deviation = %order.deviation.round_dp(2),
                multiplier = %order.multiplier,
                size = %order.size,
                amount = %order.amount.round_dp(2),
                price = %order.price,
                "Buy decided."
            );
        }
        Action::Sell(order) => {
            tracing::info!(
                symbol = %symbol,
                current_return = %order.current_return.round_dp(2),
                size = %order.size,
                amount = %order.amount.round_dp(2),
                profit = %order.profit.round_dp(2),
                price = %order.price,
                "Sell decided."
            );
        }
    }
}
