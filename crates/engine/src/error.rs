// In crates/engine/src/error.rs

use core_types::Symbol;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Symbol {0} is not tracked")]
    UnknownSymbol(Symbol),

    #[error("Not enough market data for {symbol}: {reason}")]
    MarketData { symbol: Symbol, reason: String },

    #[error("State store error: {0}")]
    Store(#[from] state_store::Error),

    #[error("API client error: {0}")]
    Api(#[from] api_client::Error),

    #[error("Execution error: {0}")]
    Execution(#[from] execution::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
