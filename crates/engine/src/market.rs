// In crates/engine/src/market.rs

use crate::Result;
use api_client::ApiClient;
use async_trait::async_trait;
use core_types::{Kline, Symbol};
use rust_decimal::Decimal;

/// Market and account data the tick runner reads.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Exchange server time in milliseconds.
    async fn server_time(&self) -> Result<i64>;

    async fn current_price(&self, symbol: &Symbol) -> Result<Decimal>;

    /// The most recent `limit` daily candles, oldest first.
    async fn daily_klines(&self, symbol: &Symbol, limit: usize) -> Result<Vec<Kline>>;

    /// Free balance of `asset` available for buying.
    async fn free_balance(&self, asset: &str) -> Result<Decimal>;
}

#[async_trait]
impl MarketData for ApiClient {
    async fn server_time(&self) -> Result<i64> {
        Ok(self.with_retries("server_time", || ApiClient::server_time(self)).await?)
    }

    async fn current_price(&self, symbol: &Symbol) -> Result<Decimal> {
        Ok(self.with_retries("ticker_price", || self.ticker_price(symbol)).await?)
    }

    async fn daily_klines(&self, symbol: &Symbol, limit: usize) -> Result<Vec<Kline>> {
        let limit = u16::try_from(limit).unwrap_or(api_client::MAX_KLINES_PER_REQUEST);
        Ok(self
            .with_retries("daily_klines", || ApiClient::daily_klines(self, symbol, limit))
            .await?)
    }

    async fn free_balance(&self, asset: &str) -> Result<Decimal> {
        Ok(self
            .with_retries("free_balance", || ApiClient::free_balance(self, asset))
            .await?)
    }
}
