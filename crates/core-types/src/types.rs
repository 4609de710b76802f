// In crates/core-types/src/types.rs

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A spot trading pair as the exchange spells it (e.g., "ETHUSDT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    /// Parses a symbol, accepting both "ETHUSDT" and the slash form "ETH/USDT".
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized: String = raw.trim().chars().filter(|c| *c != '/').collect();
        let normalized = normalized.to_ascii_uppercase();

        if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidSymbol(raw.to_string()));
        }
        Ok(Symbol(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Symbol::parse(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The direction of a spot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The exchange's wire spelling of the side.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single candlestick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
}

/// A sized order that the strategy wants an executor to place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    /// Base-asset quantity (e.g., ETH).
    pub quantity: Decimal,
    /// The price the decision was made at. Market orders may fill elsewhere.
    pub reference_price: Decimal,
}

/// The confirmed result of an executed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub symbol: Symbol,
    pub side: Side,
    /// Average fill price.
    pub price: Decimal,
    /// Filled base-asset quantity.
    pub quantity: Decimal,
    /// Quote-asset amount transacted (e.g., USDT).
    pub quote_amount: Decimal,
    pub fee: Decimal,
    pub order_id: String,
    pub source_request: OrderRequest,
}
