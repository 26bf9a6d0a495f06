use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, UtcDateTime, ValidationError};

/// Canonical top-of-book quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: Option<u64>,
    pub currency: String,
    pub as_of: UtcDateTime,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        price: f64,
        bid: Option<f64>,
        ask: Option<f64>,
        volume: Option<u64>,
        currency: impl AsRef<str>,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_optional_non_negative("bid", bid)?;
        validate_optional_non_negative("ask", ask)?;

        Ok(Self {
            symbol,
            price,
            bid,
            ask,
            volume,
            currency: validate_currency_code(currency.as_ref())?,
            as_of,
        })
    }
}

/// OHLCV bar record for a given interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl Bar {
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Series wrapper returned by the historical-prices operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, interval: Interval, bars: Vec<Bar>) -> Self {
        Self {
            symbol,
            interval,
            bars,
        }
    }
}

/// Canonical fundamentals snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: Symbol,
    pub as_of: UtcDateTime,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl Fundamentals {
    pub fn new(
        symbol: Symbol,
        as_of: UtcDateTime,
        market_cap: Option<f64>,
        pe_ratio: Option<f64>,
        dividend_yield: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_optional_non_negative("market_cap", market_cap)?;
        validate_optional_finite("pe_ratio", pe_ratio)?;
        validate_optional_non_negative("dividend_yield", dividend_yield)?;

        Ok(Self {
            symbol,
            as_of,
            market_cap,
            pe_ratio,
            dividend_yield,
        })
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
    }
    Ok(())
}
