// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("Invalid symbol '{0}': expected an uppercase pair such as ETHUSDT")]
    InvalidSymbol(String),
}

pub type Result<T> = std::result::Result<T, Error>;
