//! Source adapter contract: identity, capabilities, health, and the three
//! data-fetch operations.
//!
//! Every data source plugs into the registry through [`DataSource`]. The
//! contract is total: a source that cannot serve an operation still
//! implements the method and fails fast with
//! [`SourceError::unsupported_operation`] instead of omitting it. Callers
//! use [`CapabilitySet`] to avoid calling unsupported operations in the
//! first place.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{Fundamentals, Interval, PriceSeries, Quote, Symbol, UtcDateTime, ValidationError};

/// Boxed future used by the object-safe [`DataSource`] trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Classification of a source's availability requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Always available, no credentials or external setup.
    BuiltIn,
    /// Requires external setup (credentials, subscription); typically a
    /// premium feed, so it takes priority in the fallback chain.
    Optional,
}

/// Identity and classification of one data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub kind: SourceKind,
    pub requires_setup: bool,
}

impl SourceDescriptor {
    pub fn built_in(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::BuiltIn,
            requires_setup: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Optional,
            requires_setup: true,
        }
    }
}

/// Data kinds a source can declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Quotes,
    Historical,
    Fundamentals,
    Options,
    Economic,
    Forex,
    Crypto,
    News,
    Realtime,
}

impl Capability {
    pub const ALL: [Self; 9] = [
        Self::Quotes,
        Self::Historical,
        Self::Fundamentals,
        Self::Options,
        Self::Economic,
        Self::Forex,
        Self::Crypto,
        Self::News,
        Self::Realtime,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Historical => "historical",
            Self::Fundamentals => "fundamentals",
            Self::Options => "options",
            Self::Economic => "economic",
            Self::Forex => "forex",
            Self::Crypto => "crypto",
            Self::News => "news",
            Self::Realtime => "realtime",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quotes" => Ok(Self::Quotes),
            "historical" => Ok(Self::Historical),
            "fundamentals" => Ok(Self::Fundamentals),
            "options" => Ok(Self::Options),
            "economic" => Ok(Self::Economic),
            "forex" => Ok(Self::Forex),
            "crypto" => Ok(Self::Crypto),
            "news" => Ok(Self::News),
            "realtime" => Ok(Self::Realtime),
            other => Err(ValidationError::InvalidCapability {
                value: other.to_owned(),
            }),
        }
    }
}

/// Declared capability matrix for a data source.
///
/// Pure declaration with no lifecycle; sources recompute it on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub quotes: bool,
    pub historical: bool,
    pub fundamentals: bool,
    pub options: bool,
    pub economic: bool,
    pub forex: bool,
    pub crypto: bool,
    pub news: bool,
    pub realtime: bool,
}

impl CapabilitySet {
    pub const fn none() -> Self {
        Self {
            quotes: false,
            historical: false,
            fundamentals: false,
            options: false,
            economic: false,
            forex: false,
            crypto: false,
            news: false,
            realtime: false,
        }
    }

    /// Quotes, historical, and fundamentals: the three fetch operations.
    pub const fn core() -> Self {
        Self {
            quotes: true,
            historical: true,
            fundamentals: true,
            ..Self::none()
        }
    }

    pub const fn supports(self, capability: Capability) -> bool {
        match capability {
            Capability::Quotes => self.quotes,
            Capability::Historical => self.historical,
            Capability::Fundamentals => self.fundamentals,
            Capability::Options => self.options,
            Capability::Economic => self.economic,
            Capability::Forex => self.forex,
            Capability::Crypto => self.crypto,
            Capability::News => self.news,
            Capability::Realtime => self.realtime,
        }
    }

    pub fn supported_labels(self) -> Vec<&'static str> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.supports(*capability))
            .map(Capability::as_str)
            .collect()
    }
}

/// The three data-fetch operations of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Quote,
    HistoricalPrices,
    Fundamentals,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::HistoricalPrices => "historical_prices",
            Self::Fundamentals => "fundamentals",
        }
    }

    /// Capability flag a source must declare to serve this operation.
    pub const fn required_capability(self) -> Capability {
        match self {
            Self::Quote => Capability::Quotes,
            Self::HistoricalPrices => Capability::Historical,
            Self::Fundamentals => Capability::Fundamentals,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health state used by registry selection.
///
/// `Healthy` and `Degraded` are both selectable; only `Unavailable` excludes
/// a source from automatic selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unavailable,
}

impl HealthState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unavailable => "unavailable",
        }
    }

    pub const fn is_selectable(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

impl Display for HealthState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one health probe against a source.
///
/// One record per source; a new probe overwrites the previous record. A
/// record is trusted for selection only while its age is below the
/// registry's health-check interval.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRecord {
    pub source_name: String,
    pub state: HealthState,
    pub latency_ms: u64,
    /// Fraction of recent requests that succeeded, in `0.0..=1.0`.
    pub success_rate: f64,
    pub checked_at: Instant,
    pub error: Option<String>,
}

impl HealthRecord {
    pub fn new(
        source_name: impl Into<String>,
        state: HealthState,
        latency_ms: u64,
        success_rate: f64,
        error: Option<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            state,
            latency_ms,
            success_rate: success_rate.clamp(0.0, 1.0),
            checked_at: Instant::now(),
            error,
        }
    }

    pub fn healthy(source_name: impl Into<String>, latency_ms: u64, success_rate: f64) -> Self {
        Self::new(source_name, HealthState::Healthy, latency_ms, success_rate, None)
    }

    pub fn degraded(source_name: impl Into<String>, latency_ms: u64, success_rate: f64) -> Self {
        Self::new(source_name, HealthState::Degraded, latency_ms, success_rate, None)
    }

    pub fn unavailable(source_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            source_name,
            HealthState::Unavailable,
            0,
            0.0,
            Some(error.into()),
        )
    }

    pub fn age(&self) -> Duration {
        self.checked_at.elapsed()
    }

    pub fn is_selectable(&self) -> bool {
        self.state.is_selectable()
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    UnsupportedOperation,
    RateLimited,
    Unavailable,
    InvalidRequest,
    Unknown,
}

/// Structured source error used across the registry boundary.
///
/// Carries which source failed (when known), a stable machine-readable code,
/// and whether retrying can help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    source_name: Option<String>,
    retryable: bool,
}

impl SourceError {
    pub fn unsupported_operation(operation: Operation) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedOperation,
            message: format!("operation '{operation}' is not supported by this source"),
            source_name: None,
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            source_name: None,
            retryable: true,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            source_name: None,
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            source_name: None,
            retryable: false,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unknown,
            message: message.into(),
            source_name: None,
            retryable: false,
        }
    }

    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::UnsupportedOperation => "source.unsupported_operation",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Unknown => "source.unknown",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source_name {
            Some(source_name) => {
                write!(f, "[{source_name}] {} ({})", self.message, self.code())
            }
            None => write!(f, "{} ({})", self.message, self.code()),
        }
    }
}

impl std::error::Error for SourceError {}

/// Request payload for the quote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub symbols: Vec<Symbol>,
}

impl QuoteRequest {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "quote request must include at least one symbol",
            ));
        }
        Ok(Self { symbols })
    }
}

/// Request payload for the historical-prices operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub start: UtcDateTime,
    pub end: UtcDateTime,
}

impl HistoricalRequest {
    pub fn new(
        symbol: Symbol,
        interval: Interval,
        start: UtcDateTime,
        end: UtcDateTime,
    ) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::invalid_request(
                "historical request start must not be after end",
            ));
        }
        Ok(Self {
            symbol,
            interval,
            start,
            end,
        })
    }

    /// Cache-key fragment identifying the requested range.
    pub fn range_key(&self) -> String {
        format!("{}:{}:{}", self.interval, self.start, self.end)
    }
}

/// Request payload for the fundamentals operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundamentalsRequest {
    pub symbols: Vec<Symbol>,
}

impl FundamentalsRequest {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "fundamentals request must include at least one symbol",
            ));
        }
        Ok(Self { symbols })
    }
}

/// Normalized quote batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub quotes: Vec<Quote>,
}

/// Normalized fundamentals batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsBatch {
    pub fundamentals: Vec<Fundamentals>,
}

/// Uniform source adapter contract.
///
/// Implementations must be `Send + Sync`; the registry shares them across
/// the selection path and the background probe sweep.
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Identity and classification of this source.
    fn descriptor(&self) -> SourceDescriptor;

    /// Declared capability matrix. Pure and synchronous; recomputed per call.
    fn capabilities(&self) -> CapabilitySet;

    /// Cheap liveness probe.
    ///
    /// Must never fail: any internal error is reported as an `Unavailable`
    /// record with `error` populated rather than propagated.
    fn health_check<'a>(&'a self) -> BoxFuture<'a, HealthRecord>;

    /// Fetches quotes for the requested symbols.
    fn quote<'a>(
        &'a self,
        req: QuoteRequest,
    ) -> BoxFuture<'a, Result<QuoteBatch, SourceError>>;

    /// Fetches historical OHLCV prices for one symbol over a date range.
    fn historical_prices<'a>(
        &'a self,
        req: HistoricalRequest,
    ) -> BoxFuture<'a, Result<PriceSeries, SourceError>>;

    /// Fetches fundamentals snapshots for the requested symbols.
    fn fundamentals<'a>(
        &'a self,
        req: FundamentalsRequest,
    ) -> BoxFuture<'a, Result<FundamentalsBatch, SourceError>>;
}
