// In crates/backtester/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not enough history: {available} candles, need more than {required}")]
    NotEnoughHistory { available: usize, required: usize },

    #[error("Invalid candle timestamp {0}")]
    BadTimestamp(i64),

    #[error("Engine error: {0}")]
    Engine(#[from] engine::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
