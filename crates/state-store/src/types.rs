// In crates/state-store/src/types.rs

use crate::lenient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The on-disk shape of the whole strategy state, keyed by symbol.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default, deserialize_with = "lenient::map")]
    pub symbol_states: BTreeMap<String, PersistedSymbolState>,
}

/// One symbol's state with dates as ISO-8601 strings and `None` as `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedSymbolState {
    #[serde(default, deserialize_with = "lenient::count")]
    pub investment_count: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_investment_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_profit_taking_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_invested: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_shares: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_sell_amount: Decimal,
    #[serde(default, deserialize_with = "lenient::list")]
    pub investment_history: Vec<PersistedInvestmentRecord>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub profit_history: Vec<PersistedProfitRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedInvestmentRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub price: Decimal,
    /// Written as `ma120` by older state files.
    #[serde(default, alias = "ma120", deserialize_with = "lenient::decimal")]
    pub moving_average: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub deviation: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub multiplier: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub shares: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedProfitRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub return_percent: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub shares_sold: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub amount_received: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub cost_of_sold: Decimal,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub profit: Decimal,
}
