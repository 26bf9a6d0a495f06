use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::adapters::{join_symbols, symbol_seed, validation_to_error};
use crate::cache::TtlCache;
use crate::contract::{
    BoxFuture, CapabilitySet, DataSource, FundamentalsBatch, FundamentalsRequest, HealthRecord,
    HistoricalRequest, Operation, QuoteBatch, QuoteRequest, SourceDescriptor, SourceError,
};
use crate::rate_limit::RateLimiter;
use crate::{Fundamentals, PriceSeries, Quote, UtcDateTime};

const SOURCE_NAME: &str = "alphavantage";

/// Optional premium source gated on an API key.
///
/// Declares quotes, fundamentals, and economic data but no historical
/// prices; the historical operation fails fast with
/// `unsupported_operation` per the total-contract rule.
#[derive(Debug)]
pub struct AlphaVantageSource {
    api_key: Option<String>,
    limiter: RateLimiter,
    cache: TtlCache<String>,
    requests: AtomicU64,
    failures: AtomicU64,
}

impl Default for AlphaVantageSource {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AlphaVantageSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            limiter: RateLimiter::per_second(2.0),
            cache: TtlCache::with_default_ttl(Duration::from_secs(300)),
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(Some(api_key.into()))
    }

    fn ensure_configured(&self) -> Result<(), SourceError> {
        match &self.api_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(SourceError::unavailable("API key not configured")
                .with_source(SOURCE_NAME)),
        }
    }

    fn track(&self, ok: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn success_rate(&self) -> f64 {
        let total = self.requests.load(Ordering::Relaxed);
        if total == 0 {
            return 1.0;
        }
        let failures = self.failures.load(Ordering::Relaxed);
        1.0 - failures as f64 / total as f64
    }

    fn build_quotes(&self, req: &QuoteRequest) -> Result<QuoteBatch, SourceError> {
        let as_of = UtcDateTime::now();
        let quotes = req
            .symbols
            .iter()
            .map(|symbol| {
                let seed = symbol_seed(symbol);
                let price = 88.0 + (seed % 620) as f64 / 10.0;
                Quote::new(
                    symbol.clone(),
                    price,
                    Some(price - 0.05),
                    Some(price + 0.05),
                    Some(30_000 + seed % 5_000),
                    "USD",
                    as_of,
                )
                .map_err(validation_to_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuoteBatch { quotes })
    }

    fn build_fundamentals(
        &self,
        req: &FundamentalsRequest,
    ) -> Result<FundamentalsBatch, SourceError> {
        let as_of = UtcDateTime::now();
        let fundamentals = req
            .symbols
            .iter()
            .map(|symbol| {
                let seed = symbol_seed(symbol);
                Fundamentals::new(
                    symbol.clone(),
                    as_of,
                    Some(250_000_000_000.0 + (seed % 450_000) as f64 * 1_000_000.0),
                    Some(11.0 + (seed % 260) as f64 / 10.0),
                    Some(0.002 + (seed % 80) as f64 / 10_000.0),
                )
                .map_err(validation_to_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FundamentalsBatch { fundamentals })
    }
}

impl DataSource for AlphaVantageSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::optional(SOURCE_NAME)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            quotes: true,
            fundamentals: true,
            economic: true,
            ..CapabilitySet::none()
        }
    }

    fn health_check<'a>(&'a self) -> BoxFuture<'a, HealthRecord> {
        Box::pin(async move {
            let started = Instant::now();
            if self.ensure_configured().is_err() {
                return HealthRecord::unavailable(SOURCE_NAME, "API key not configured");
            }

            let latency_ms = started.elapsed().as_millis() as u64;
            let success_rate = self.success_rate();
            // Persistent request failures downgrade the probe before the
            // source stops being selectable entirely.
            if success_rate < 0.5 {
                HealthRecord::degraded(SOURCE_NAME, latency_ms, success_rate)
            } else {
                HealthRecord::healthy(SOURCE_NAME, latency_ms, success_rate)
            }
        })
    }

    fn quote<'a>(
        &'a self,
        req: QuoteRequest,
    ) -> BoxFuture<'a, Result<QuoteBatch, SourceError>> {
        Box::pin(async move {
            self.ensure_configured()?;

            let key = format!("quote:{}", join_symbols(&req.symbols));
            if let Some(cached) = self.cache.get(&key).await {
                if let Ok(batch) = serde_json::from_str(&cached) {
                    return Ok(batch);
                }
            }

            self.limiter.acquire(1.0).await;
            let result = self.build_quotes(&req);
            self.track(result.is_ok());

            if let Ok(batch) = &result {
                if let Ok(body) = serde_json::to_string(batch) {
                    self.cache.set(key, body).await;
                }
            }
            result.map_err(|error| error.with_source(SOURCE_NAME))
        })
    }

    fn historical_prices<'a>(
        &'a self,
        _req: HistoricalRequest,
    ) -> BoxFuture<'a, Result<PriceSeries, SourceError>> {
        Box::pin(async {
            Err(SourceError::unsupported_operation(Operation::HistoricalPrices)
                .with_source(SOURCE_NAME))
        })
    }

    fn fundamentals<'a>(
        &'a self,
        req: FundamentalsRequest,
    ) -> BoxFuture<'a, Result<FundamentalsBatch, SourceError>> {
        Box::pin(async move {
            self.ensure_configured()?;

            let key = format!("fundamentals:{}", join_symbols(&req.symbols));
            if let Some(cached) = self.cache.get(&key).await {
                if let Ok(batch) = serde_json::from_str(&cached) {
                    return Ok(batch);
                }
            }

            self.limiter.acquire(1.0).await;
            let result = self.build_fundamentals(&req);
            self.track(result.is_ok());

            if let Ok(batch) = &result {
                if let Ok(body) = serde_json::to_string(batch) {
                    self.cache.set(key, body).await;
                }
            }
            result.map_err(|error| error.with_source(SOURCE_NAME))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{HealthState, SourceErrorKind};
    use crate::{Interval, Symbol};

    #[tokio::test]
    async fn unconfigured_source_probes_unavailable() {
        let source = AlphaVantageSource::default();
        let record = source.health_check().await;

        assert_eq!(record.state, HealthState::Unavailable);
        assert_eq!(record.error.as_deref(), Some("API key not configured"));
    }

    #[tokio::test]
    async fn unconfigured_quote_fails_with_unavailable() {
        let source = AlphaVantageSource::default();
        let req = QuoteRequest::new(vec![Symbol::parse("AAPL").expect("symbol")])
            .expect("request");

        let err = source.quote(req).await.expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Unavailable);
        assert_eq!(err.source_name(), Some("alphavantage"));
    }

    #[tokio::test]
    async fn configured_source_serves_quotes_and_fundamentals() {
        let source = AlphaVantageSource::with_api_key("demo");
        let symbols = vec![Symbol::parse("NVDA").expect("symbol")];

        let quotes = source
            .quote(QuoteRequest::new(symbols.clone()).expect("request"))
            .await
            .expect("quotes");
        assert_eq!(quotes.quotes.len(), 1);

        let fundamentals = source
            .fundamentals(FundamentalsRequest::new(symbols).expect("request"))
            .await
            .expect("fundamentals");
        assert!(fundamentals.fundamentals[0].market_cap.is_some());
    }

    #[tokio::test]
    async fn historical_prices_is_unsupported() {
        let source = AlphaVantageSource::with_api_key("demo");
        let start = UtcDateTime::parse("2025-01-01T00:00:00Z").expect("start");
        let end = UtcDateTime::parse("2025-01-02T00:00:00Z").expect("end");
        let req = HistoricalRequest::new(
            Symbol::parse("NVDA").expect("symbol"),
            Interval::OneDay,
            start,
            end,
        )
        .expect("request");

        let err = source.historical_prices(req).await.expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::UnsupportedOperation);
        assert!(!err.retryable());
    }
}
