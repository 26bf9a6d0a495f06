//! Core resilience layer for multi-source market data.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The uniform source contract (capabilities, health, structured errors)
//! - The adapter registry with health-aware selection and fallback
//! - Token-bucket rate limiting and TTL response caching
//! - Deterministic source adapters

pub mod adapters;
pub mod cache;
pub mod contract;
pub mod domain;
pub mod error;
pub mod rate_limit;
pub mod registry;

pub use adapters::{AlphaVantageSource, YahooSource};
pub use cache::{CacheConfig, TtlCache};
pub use contract::{
    BoxFuture, Capability, CapabilitySet, DataSource, FundamentalsBatch, FundamentalsRequest,
    HealthRecord, HealthState, HistoricalRequest, Operation, QuoteBatch, QuoteRequest,
    SourceDescriptor, SourceError, SourceErrorKind, SourceKind,
};
pub use domain::{
    validate_currency_code, Bar, Fundamentals, Interval, PriceSeries, Quote, Symbol, UtcDateTime,
};
pub use error::{CoreError, RegistryError, ValidationError};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use registry::{AdapterRegistry, RegistryConfig, SourceSnapshot};
