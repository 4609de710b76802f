// In crates/state-store/src/convert.rs

//! Conversion between the strategy's typed state and its persisted form.
//! All date <-> string handling lives here.

use crate::types::{PersistedInvestmentRecord, PersistedProfitRecord, PersistedState, PersistedSymbolState};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use core_types::Symbol;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use strategies::{InvestmentRecord, ProfitRecord, SymbolState};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshots every symbol's state into its persisted form.
pub fn to_persistable(states: &BTreeMap<Symbol, SymbolState>) -> PersistedState {
    PersistedState {
        symbols: states.keys().map(|s| s.0.clone()).collect(),
        symbol_states: states
            .iter()
            .map(|(symbol, state)| (symbol.0.clone(), persist_symbol_state(state)))
            .collect(),
    }
}

/// Rebuilds the state of every `tracked` symbol from a snapshot.
///
/// Stored symbols that are not tracked are ignored; tracked symbols missing
/// from the snapshot start fresh. Stored keys are matched after normalization,
/// so "ETH/USDT" in an old file still finds "ETHUSDT".
pub fn from_persistable(persisted: PersistedState, tracked: &[Symbol]) -> BTreeMap<Symbol, SymbolState> {
    let mut stored: BTreeMap<Symbol, PersistedSymbolState> = BTreeMap::new();
    for (key, state) in persisted.symbol_states {
        match Symbol::parse(&key) {
            Ok(symbol) if tracked.contains(&symbol) => {
                stored.insert(symbol, state);
            }
            Ok(symbol) => {
                tracing::info!(symbol = %symbol, "Ignoring stored state for a symbol that is no longer configured.");
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring stored state under an invalid symbol key.");
            }
        }
    }

    tracked
        .iter()
        .map(|symbol| {
            let state = match stored.remove(symbol) {
                Some(persisted) => restore_symbol_state(symbol, persisted),
                None => {
                    tracing::info!(symbol = %symbol, "No stored state for symbol, starting fresh.");
                    SymbolState::new()
                }
            };
            (symbol.clone(), state)
        })
        .collect()
}

fn persist_symbol_state(state: &SymbolState) -> PersistedSymbolState {
    PersistedSymbolState {
        investment_count: state.investment_count,
        last_investment_date: state.last_investment_date.map(format_date),
        last_profit_taking_date: state.last_profit_taking_date.map(format_date),
        total_invested: state.total_invested,
        total_shares: state.total_shares,
        total_sell_amount: state.total_sell_amount,
        investment_history: state
            .investment_history
            .iter()
            .map(|r| PersistedInvestmentRecord {
                date: Some(format_date(r.date)),
                price: r.price,
                moving_average: r.moving_average,
                deviation: r.deviation,
                multiplier: r.multiplier,
                amount: r.amount,
                shares: r.shares,
            })
            .collect(),
        profit_history: state
            .profit_history
            .iter()
            .map(|r| PersistedProfitRecord {
                date: Some(format_date(r.date)),
                price: r.price,
                return_percent: r.return_percent,
                shares_sold: r.shares_sold,
                amount_received: r.amount_received,
                cost_of_sold: r.cost_of_sold,
                profit: r.profit,
            })
            .collect(),
    }
}

fn restore_symbol_state(symbol: &Symbol, persisted: PersistedSymbolState) -> SymbolState {
    let investment_history = persisted
        .investment_history
        .into_iter()
        .filter_map(|r| {
            let Some(date) = parse_date(r.date.as_deref()) else {
                tracing::warn!(symbol = %symbol, date = ?r.date, "Dropping investment record without a readable date.");
                return None;
            };
            Some(InvestmentRecord {
                date,
                price: r.price,
                moving_average: r.moving_average,
                deviation: r.deviation,
                multiplier: r.multiplier,
                amount: r.amount,
                shares: r.shares,
            })
        })
        .collect();

    let profit_history = persisted
        .profit_history
        .into_iter()
        .filter_map(|r| {
            let Some(date) = parse_date(r.date.as_deref()) else {
                tracing::warn!(symbol = %symbol, date = ?r.date, "Dropping profit record without a readable date.");
                return None;
            };
            Some(ProfitRecord {
                date,
                price: r.price,
                return_percent: r.return_percent,
                shares_sold: r.shares_sold,
                amount_received: r.amount_received,
                cost_of_sold: r.cost_of_sold,
                profit: r.profit,
            })
        })
        .collect();

    SymbolState {
        investment_count: persisted.investment_count,
        last_investment_date: parse_date(persisted.last_investment_date.as_deref()),
        last_profit_taking_date: parse_date(persisted.last_profit_taking_date.as_deref()),
        total_invested: non_negative(symbol, "total_invested", persisted.total_invested),
        total_shares: non_negative(symbol, "total_shares", persisted.total_shares),
        total_sell_amount: non_negative(symbol, "total_sell_amount", persisted.total_sell_amount),
        investment_history,
        profit_history,
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Reads a calendar date. Full ISO datetimes are truncated to their date.
/// Anything unreadable is treated as absent.
fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(datetime) = raw.parse::<NaiveDateTime>() {
        return Some(datetime.date());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    tracing::warn!(value = raw, "Unreadable date in state file, treating it as absent.");
    None
}

fn non_negative(symbol: &Symbol, field: &str, value: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        tracing::warn!(symbol = %symbol, field, %value, "Negative total in state file, clamping to 0.");
        Decimal::ZERO
    } else {
        value
    }
}
