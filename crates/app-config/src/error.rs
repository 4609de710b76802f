// In crates/app-config/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid strategy configuration: {0}")]
    StrategyError(#[from] strategies::Error),

    #[error("Invalid asset configuration: {0}")]
    SymbolError(#[from] core_types::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
