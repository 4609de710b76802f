// In crates/api-client/src/types.rs

use core_types::Kline;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// The main client for interacting with the Binance spot API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The persistent HTTP client.
    pub http_client: Client,
    /// The user's Binance API key.
    pub api_key: String,
    /// The user's Binance secret key.
    pub secret_key: String,
    /// The base URL for the Binance spot API.
    pub base_url: String,
    pub recv_window_ms: u64,
    pub max_retries: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    pub server_time: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: Decimal,
}

/// A single asset's balance in the spot account.
#[derive(Debug, Deserialize, Clone)]
pub struct Balance {
    /// The asset's symbol (e.g., "USDT").
    pub asset: String,
    /// Available for new orders.
    pub free: Decimal,
    /// Held by open orders.
    pub locked: Decimal,
}

/// The spot account as returned by `GET /api/v3/account`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default)]
    pub can_trade: bool,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    /// The free balance of `asset`, zero when the account holds none.
    pub fn free(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .find(|b| b.asset.eq_ignore_ascii_case(asset))
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Temporary struct to deserialize the kline response from Binance,
/// which is a JSON array of mixed types.
#[derive(Debug, Deserialize)]
pub struct RawKline(
    pub i64,         // 0: Open time
    pub String,      // 1: Open
    pub String,      // 2: High
    pub String,      // 3: Low
    pub String,      // 4: Close
    pub String,      // 5: Volume
    pub i64,         // 6: Close time
    pub String,      // 7: Quote asset volume
    pub i64,         // 8: Number of trades
    pub String,      // 9: Taker buy base asset volume
    pub String,      // 10: Taker buy quote asset volume
    pub String,      // 11: Ignore
);

impl TryFrom<RawKline> for Kline {
    type Error = crate::Error;

    fn try_from(raw: RawKline) -> crate::Result<Self> {
        let field = |name: &str, value: &str| {
            Decimal::from_str(value)
                .map_err(|e| crate::Error::CustomError(format!("bad kline {} '{}': {}", name, value, e)))
        };
        Ok(Kline {
            open_time: raw.0,
            open: field("open", &raw.1)?,
            high: field("high", &raw.2)?,
            low: field("low", &raw.3)?,
            close: field("close", &raw.4)?,
            volume: field("volume", &raw.5)?,
            close_time: raw.6,
        })
    }
}

/// One fill of a market order.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub price: Decimal,
    pub qty: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
}

/// The `FULL` response of `POST /api/v3/order`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderResponse {
    pub symbol: String,
    pub order_id: i64,
    #[serde(default)]
    pub client_order_id: String,
    pub status: String,
    pub side: String, // "BUY" or "SELL"
    pub r#type: String,
    /// The actual filled quantity.
    pub executed_qty: Decimal,
    /// Binance's spelling.
    #[serde(rename = "cummulativeQuoteQty")]
    pub cumulative_quote_qty: Decimal,
    #[serde(default)]
    pub fills: Vec<Fill>,
}

impl NewOrderResponse {
    /// Volume-weighted fill price, `None` when nothing was filled.
    pub fn average_price(&self) -> Option<Decimal> {
        if self.executed_qty.is_zero() {
            None
        } else {
            Some(self.cumulative_quote_qty / self.executed_qty)
        }
    }

    /// Sum of the commissions charged across fills, in whatever assets Binance used.
    pub fn total_commission(&self) -> Decimal {
        self.fills.iter().map(|f| f.commission).sum()
    }
}

/// `GET /api/v3/exchangeInfo`, narrowed to what order sizing needs.
#[derive(Debug, Deserialize, Clone)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

impl SymbolInfo {
    pub fn lot_size(&self) -> Option<LotSize> {
        self.filters.iter().find_map(|filter| match filter {
            SymbolFilter::LotSize(lot) => Some(*lot),
            SymbolFilter::Other => None,
        })
    }
}

/// A trading rule attached to a symbol. Only `LOT_SIZE` is read.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE")]
    LotSize(LotSize),
    #[serde(other)]
    Other,
}

/// The quantity rule of a symbol: orders must be a whole number of `step_size`
/// and lie within `[min_qty, max_qty]`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LotSize {
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    pub step_size: Decimal,
}

impl LotSize {
    /// Rounds `quantity` down to a whole number of steps. A zero step leaves it unchanged.
    pub fn floor(&self, quantity: Decimal) -> Decimal {
        if self.step_size <= Decimal::ZERO {
            return quantity;
        }
        match quantity.checked_div(self.step_size) {
            Some(steps) => (steps.floor() * self.step_size).normalize(),
            None => quantity,
        }
    }
}
