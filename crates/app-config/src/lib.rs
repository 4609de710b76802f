// In crates/app-config/src/lib.rs

use config::{Config, Environment, File};
use std::path::Path;

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{AppSettings, AssetConfig, BinanceSettings, LiveRunConfig, Settings, StrategySettings};

/// Loads the application settings from the `config/` directory.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(Path::new("config"))
}

/// Loads the application settings from various sources.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads from a default `base.toml` file.
/// 2. Merges settings from an environment-specific file (e.g., `production.toml`).
/// 3. Merges settings from environment variables (e.g., `APP_BINANCE__API_KEY=...`).
pub fn load_settings_from(dir: &Path) -> Result<Settings> {
    // Get the current environment. Default to "development" if not set.
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

    let settings = Config::builder()
        .add_source(File::from(dir.join("base")))
        .add_source(File::from(dir.join(&environment)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.app.check_time()?;

    Ok(settings)
}

/// Loads the tracked assets from `config/live.toml`.
pub fn load_live_config() -> Result<LiveRunConfig> {
    load_live_config_from(Path::new("config"))
}

pub fn load_live_config_from(dir: &Path) -> Result<LiveRunConfig> {
    let config = Config::builder()
        .add_source(File::from(dir.join("live")))
        .build()?;

    Ok(config.try_deserialize()?)
}
