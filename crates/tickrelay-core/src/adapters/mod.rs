//! Deterministic source adapters.
//!
//! These stand in for real vendor integrations: they generate seeded,
//! repeatable payloads and normalize them through the domain constructors,
//! while exercising the full contract including each source's own rate
//! limiter and response cache.

mod alphavantage;
mod yahoo;

pub use alphavantage::AlphaVantageSource;
pub use yahoo::YahooSource;

use crate::{SourceError, Symbol, ValidationError};

pub(crate) fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

pub(crate) fn join_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(Symbol::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub(crate) fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::unknown(error.to_string())
}
