// In crates/app-config/src/types.rs

use crate::{Error, Result};
use chrono::NaiveTime;
use core_types::Symbol;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use strategies::{MultiplierTable, StrategyConfig};

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    /// Settings for the Binance API.
    #[serde(default)]
    pub binance: BinanceSettings,
    /// Parameters shared by every tracked asset.
    #[serde(default)]
    pub strategy: StrategySettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// The log filter for the application (e.g., "info", "engine=debug,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// When true, orders are logged and simulated instead of sent to the exchange.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Local wall-clock time of the daily check, "HH:MM".
    #[serde(default = "default_check_time")]
    pub check_time: String,
    /// Where the strategy state is persisted.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    /// Directory for the log file.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl AppSettings {
    /// Parses `check_time` into a time of day.
    pub fn check_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.check_time.trim(), "%H:%M").map_err(|e| {
            Error::Invalid(format!("check_time '{}' is not HH:MM: {}", self.check_time, e))
        })
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            dry_run: default_dry_run(),
            check_time: default_check_time(),
            state_path: default_state_path(),
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct BinanceSettings {
    /// The API key for Binance.
    #[serde(default)]
    pub api_key: String,
    /// The secret key for Binance.
    #[serde(default)]
    pub secret_key: String,
    /// The REST API base URL for Binance spot.
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    /// The asset buys are paid in and sells are paid out in.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// How many times a failed request is attempted before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for BinanceSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            rest_base_url: default_rest_base_url(),
            quote_asset: default_quote_asset(),
            recv_window_ms: default_recv_window_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Strategy parameters shared across assets. Base cash is per asset.
#[derive(Deserialize, Debug, Clone)]
pub struct StrategySettings {
    #[serde(default = "default_investment_interval_days")]
    pub investment_interval_days: u32,
    #[serde(default = "default_target_return")]
    pub target_return: Decimal,
    #[serde(default = "default_sell_ratio")]
    pub sell_ratio: Decimal,
    #[serde(default = "default_profit_taking_cooldown_days")]
    pub profit_taking_cooldown_days: u32,
    #[serde(default)]
    pub max_single_order: Option<Decimal>,
    #[serde(default)]
    pub multiplier_table: MultiplierTable,
    /// Number of daily closes in the moving average.
    #[serde(default = "default_moving_average_period")]
    pub moving_average_period: usize,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            investment_interval_days: default_investment_interval_days(),
            target_return: default_target_return(),
            sell_ratio: default_sell_ratio(),
            profit_taking_cooldown_days: default_profit_taking_cooldown_days(),
            max_single_order: None,
            multiplier_table: MultiplierTable::default(),
            moving_average_period: default_moving_average_period(),
        }
    }
}

impl StrategySettings {
    /// The validated strategy config of one asset.
    pub fn config_for(&self, base_cash: Decimal) -> Result<StrategyConfig> {
        let config = StrategyConfig {
            base_cash,
            investment_interval_days: self.investment_interval_days,
            target_return: self.target_return,
            sell_ratio: self.sell_ratio,
            profit_taking_cooldown_days: self.profit_taking_cooldown_days,
            max_single_order: self.max_single_order,
            multiplier_table: self.multiplier_table,
        };
        config.validate()?;
        Ok(config)
    }
}

// --- Structs for live.toml Configuration ---

/// The set of assets the bot trades.
#[derive(Deserialize, Debug, Clone)]
pub struct LiveRunConfig {
    #[serde(rename = "assets")]
    pub asset_configs: Vec<AssetConfig>,
}

/// Configuration for a single tracked asset.
#[derive(Deserialize, Debug, Clone)]
pub struct AssetConfig {
    pub symbol: String,
    /// Quote amount invested per period at a 1.0x multiplier.
    pub base_cash: Decimal,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl LiveRunConfig {
    /// Builds one validated strategy config per enabled asset, in file order.
    pub fn strategy_configs(&self, strategy: &StrategySettings) -> Result<Vec<(Symbol, StrategyConfig)>> {
        let mut seen = HashSet::new();
        let mut configs = Vec::new();

        for asset in self.asset_configs.iter().filter(|a| a.enabled) {
            let symbol = Symbol::parse(&asset.symbol)?;
            if !seen.insert(symbol.clone()) {
                return Err(Error::Invalid(format!("asset {} is configured twice", symbol)));
            }
            configs.push((symbol, strategy.config_for(asset.base_cash)?));
        }

        if configs.is_empty() {
            return Err(Error::Invalid("no enabled assets in live.toml".to_string()));
        }
        Ok(configs)
    }
}

/// Helper functions for serde defaults
fn default_environment() -> String { "development".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_dry_run() -> bool { true }
fn default_check_time() -> String { "20:00".to_string() }
fn default_state_path() -> PathBuf { PathBuf::from("data/multi_strategy_state.json") }
fn default_log_dir() -> PathBuf { PathBuf::from("logs") }
fn default_rest_base_url() -> String { "https://api.binance.com".to_string() }
fn default_quote_asset() -> String { "USDT".to_string() }
fn default_recv_window_ms() -> u64 { 5000 }
fn default_max_retries() -> u32 { 3 }
fn default_investment_interval_days() -> u32 { 14 }
fn default_target_return() -> Decimal { Decimal::from(75) }
fn default_sell_ratio() -> Decimal { Decimal::new(5, 1) }
fn default_profit_taking_cooldown_days() -> u32 { 30 }
fn default_moving_average_period() -> usize { 120 }
fn default_enabled() -> bool { true }
