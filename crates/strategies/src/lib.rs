// In crates/strategies/src/lib.rs

pub mod action;
pub mod dfa;
pub mod error;
pub mod indicators;
pub mod state;
pub mod types;

// Re-export public types
pub use action::{Action, BuyOrder, Fill, SellOrder, SkipReason};
pub use dfa::{
    ProfitGate, book_buy, book_sell, calculate_deviation, days_until_next_investment,
    evaluate_investment, evaluate_profit_taking, profit_gate, should_invest_today, should_take_profit,
};
pub use error::{Error, Result};
pub use state::{InvestmentRecord, ProfitRecord, SymbolState};
pub use types::{MultiplierTable, StrategyConfig};
