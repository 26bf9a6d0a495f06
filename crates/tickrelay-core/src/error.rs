use thiserror::Error;

/// Validation and contract errors exposed by `tickrelay-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 1m, 5m, 15m, 1h, 1d")]
    InvalidInterval { value: String },
    #[error("invalid capability '{value}'")]
    InvalidCapability { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,
}

/// Registry configuration errors.
///
/// These are programmer-error conditions: they indicate a wiring bug rather
/// than a transient runtime failure, and none of them is retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("source '{name}' is already registered")]
    DuplicateSource { name: String },
    #[error("fallback chain references unknown source '{name}'")]
    UnknownChainEntry { name: String },
    #[error("fallback chain lists source '{name}' more than once")]
    DuplicateChainEntry { name: String },
    #[error("registry has been disposed")]
    Disposed,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
