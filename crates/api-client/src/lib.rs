// In crates/api-client/src/lib.rs

use app_config::types::BinanceSettings;
use chrono::Utc;
use core_types::{Kline, Side, Symbol};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
use std::future::Future;
use std::time::Duration;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

pub mod error;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use types::*;

/// Binance caps a single klines request at this many candles.
pub const MAX_KLINES_PER_REQUEST: u16 = 1000;

const RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

impl ApiClient {
    /// Constructs a new ApiClient from BinanceSettings.
    pub fn new(settings: &BinanceSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(ApiClient {
            http_client,
            api_key: settings.api_key.clone(),
            secret_key: settings.secret_key.clone(),
            base_url: settings.rest_base_url.trim_end_matches('/').to_string(),
            recv_window_ms: settings.recv_window_ms,
            max_retries: settings.max_retries.max(1),
        })
    }

    /// Generates an HMAC-SHA256 signature for a given query string.
    fn sign(&self, query_string: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Appends `recvWindow`, `timestamp` and the signature to `params`.
    fn create_signed_query(&self, params: &mut String) {
        let timestamp = Utc::now().timestamp_millis();

        if !params.is_empty() {
            params.push('&');
        }
        params.push_str(&format!("recvWindow={}&timestamp={}", self.recv_window_ms, timestamp));

        let signature = self.sign(params);
        params.push_str(&format!("&signature={}", signature));
    }

    /// Runs `call` up to `max_retries` times, waiting 5s, 10s, ... between attempts.
    pub async fn with_retries<T, F, Fut>(&self, what: &str, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_with_backoff(what, self.max_retries, RETRY_BASE_DELAY, call).await
    }

    /// Binance server time in milliseconds. Corresponds to `GET /api/v3/time`.
    pub async fn server_time(&self) -> Result<i64> {
        let url = format!("{}/api/v3/time", self.base_url);
        let time: ServerTime = self.get_public(&url).await?;
        Ok(time.server_time)
    }

    /// Latest traded price. Corresponds to `GET /api/v3/ticker/price`.
    pub async fn ticker_price(&self, symbol: &Symbol) -> Result<Decimal> {
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, symbol.as_str());
        let ticker: TickerPrice = self.get_public(&url).await?;
        Ok(ticker.price)
    }

    /// The most recent `limit` daily candles, oldest first.
    ///
    /// This corresponds to the `GET /api/v3/klines` endpoint with `interval=1d`.
    /// The last candle is the still-open current day.
    pub async fn daily_klines(&self, symbol: &Symbol, limit: u16) -> Result<Vec<Kline>> {
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval=1d&limit={}",
            self.base_url,
            symbol.as_str(),
            limit
        );

        let raw_klines: Vec<RawKline> = self.get_public(&url).await?;
        raw_klines.into_iter().map(Kline::try_from).collect()
    }

    /// The symbol's `LOT_SIZE` filter. Corresponds to `GET /api/v3/exchangeInfo`.
    pub async fn lot_size(&self, symbol: &Symbol) -> Result<LotSize> {
        let url = format!("{}/api/v3/exchangeInfo?symbol={}", self.base_url, symbol.as_str());
        let info: ExchangeInfo = self.get_public(&url).await?;
        info.symbols
            .iter()
            .find(|s| s.symbol == symbol.as_str())
            .and_then(SymbolInfo::lot_size)
            .ok_or_else(|| Error::CustomError(format!("no LOT_SIZE filter for {}", symbol.as_str())))
    }

    /// Fetches the spot account. Corresponds to the signed `GET /api/v3/account`.
    pub async fn account(&self) -> Result<AccountInfo> {
        let mut params = String::from("omitZeroBalances=true");
        self.create_signed_query(&mut params);

        let url = format!("{}/api/v3/account?{}", self.base_url, params);
        let response = self
            .http_client
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        parse_response(&response.text().await?)
    }

    /// The free balance of a single asset.
    pub async fn free_balance(&self, asset: &str) -> Result<Decimal> {
        Ok(self.account().await?.free(asset))
    }

    /// Places a new market order.
    /// Corresponds to the signed `POST /api/v3/order`.
    pub async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Decimal,
    ) -> Result<NewOrderResponse> {
        if quantity <= Decimal::ZERO {
            return Err(Error::CustomError(format!("refusing to send order with quantity {}", quantity)));
        }

        let mut params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newOrderRespType=FULL",
            symbol.as_str(),
            side.as_str(),
            quantity.normalize()
        );
        self.create_signed_query(&mut params);

        let url = format!("{}/api/v3/order?{}", self.base_url, params);

        tracing::info!(symbol = %symbol, side = side.as_str(), %quantity, "Sending market order.");
        let response = self
            .http_client
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        parse_response(&response.text().await?)
    }

    async fn get_public<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.http_client.get(url).send().await?.text().await?;
        parse_response(&body)
    }
}

// Free function to allow api_client::new usage
pub fn new(settings: &BinanceSettings) -> Result<ApiClient> {
    ApiClient::new(settings)
}

/// Decodes a Binance response body, turning `{code, msg}` bodies into `Error::ApiError`.
fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body)?;

    if let Some(code) = value.get("code").and_then(Value::as_i64) {
        if code != 0 {
            let msg = value
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(Error::ApiError { code, msg });
        }
    }

    Ok(serde_json::from_value(value)?)
}

async fn retry_with_backoff<T, F, Fut>(
    what: &str,
    max_attempts: u32,
    base_delay: Duration,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let wait = base_delay * attempt;
                tracing::warn!(
                    what,
                    attempt,
                    max_attempts,
                    error = %e,
                    wait_secs = wait.as_secs(),
                    "Request failed, retrying."
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(what, attempts = attempt, error = %e, "Request failed, giving up.");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn client() -> ApiClient {
        ApiClient::new(&BinanceSettings {
            api_key: "key".into(),
            secret_key: "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".into(),
            ..BinanceSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn signs_like_the_binance_docs() {
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            client().sign(query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn signed_query_carries_window_timestamp_and_signature() {
        let mut params = String::from("symbol=ETHUSDT");
        client().create_signed_query(&mut params);
        assert!(params.starts_with("symbol=ETHUSDT&recvWindow=5000&timestamp="));
        let (unsigned, signature) = params.rsplit_once("&signature=").unwrap();
        assert_eq!(signature, client().sign(unsigned));
    }

    #[test]
    fn error_bodies_become_api_errors() {
        let err = parse_response::<TickerPrice>(r#"{"code": -1121, "msg": "Invalid symbol."}"#).unwrap_err();
        match err {
            Error::ApiError { code, msg } => {
                assert_eq!(code, -1121);
                assert_eq!(msg, "Invalid symbol.");
            }
            other => panic!("unexpected error: {other}"),
        }

        let ticker: TickerPrice = parse_response(r#"{"symbol": "SUIUSDT", "price": "1.23450000"}"#).unwrap();
        assert_eq!(ticker.price.to_string(), "1.23450000");
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = Cell::new(0);
        let result = retry_with_backoff("ticker_price", 3, Duration::from_secs(5), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 { Err(Error::CustomError("flaky".into())) } else { Ok(n) }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<()> = retry_with_backoff("ticker_price", 2, Duration::from_secs(5), || {
            calls.set(calls.get() + 1);
            async { Err(Error::CustomError("down".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }
}
