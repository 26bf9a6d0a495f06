use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::adapters::{join_symbols, symbol_seed, validation_to_error};
use crate::cache::TtlCache;
use crate::contract::{
    BoxFuture, CapabilitySet, DataSource, FundamentalsBatch, FundamentalsRequest, HealthRecord,
    HealthState, HistoricalRequest, QuoteBatch, QuoteRequest, SourceDescriptor, SourceError,
};
use crate::rate_limit::RateLimiter;
use crate::{Bar, Fundamentals, PriceSeries, Quote, UtcDateTime};

const SOURCE_NAME: &str = "yahoo";
const MAX_BARS: usize = 500;

/// Built-in quote/historical/fundamentals source with no setup requirements.
///
/// Owns one rate limiter and one response cache, keyed per operation and
/// request parameters.
#[derive(Debug)]
pub struct YahooSource {
    limiter: RateLimiter,
    cache: TtlCache<String>,
    requests: AtomicU64,
    failures: AtomicU64,
    forced_state: Option<HealthState>,
}

impl Default for YahooSource {
    fn default() -> Self {
        Self {
            limiter: RateLimiter::per_second(5.0),
            cache: TtlCache::with_default_ttl(Duration::from_secs(60)),
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            forced_state: None,
        }
    }
}

impl YahooSource {
    /// Source that always probes into the given state. Test scaffolding for
    /// fallback scenarios.
    pub fn with_health(state: HealthState) -> Self {
        Self {
            forced_state: Some(state),
            ..Self::default()
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
                let price = 92.0 + (seed % 500) as f64 / 10.0;
                Quote::new(
                    symbol.clone(),
                    price,
                    Some(price - 0.08),
                    Some(price + 0.08),
                    Some(50_000 + seed % 10_000),
                    "USD",
                    as_of,
                )
                .map_err(validation_to_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuoteBatch { quotes })
    }

    fn build_series(&self, req: &HistoricalRequest) -> Result<PriceSeries, SourceError> {
        let step = req.interval.span();
        let seed = symbol_seed(&req.symbol);
        let start = req.start.into_inner();
        let end = req.end.into_inner();

        let mut bars = Vec::new();
        let mut index = 0_usize;
        loop {
            let ts = start + step * index as i32;
            if ts > end || bars.len() >= MAX_BARS {
                break;
            }

            let ts = UtcDateTime::from_offset_datetime(ts).map_err(validation_to_error)?;
            let base = 90.0 + ((seed + index as u64) % 350) as f64 / 10.0;
            bars.push(
                Bar::new(
                    ts,
                    base,
                    base + 1.20,
                    base - 0.80,
                    base + 0.30,
                    Some(20_000 + index as u64 * 25),
                )
                .map_err(validation_to_error)?,
            );
            index += 1;
        }

        Ok(PriceSeries::new(req.symbol.clone(), req.interval, bars))
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
                    Some(500_000_000_000.0 + (seed % 300_000) as f64 * 1_000_000.0),
                    Some(14.0 + (seed % 200) as f64 / 10.0),
                    Some(0.005 + (seed % 50) as f64 / 10_000.0),
                )
                .map_err(validation_to_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FundamentalsBatch { fundamentals })
    }
}

impl DataSource for YahooSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor::built_in(SOURCE_NAME)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            forex: true,
            crypto: true,
            ..CapabilitySet::core()
        }
    }

    fn health_check<'a>(&'a self) -> BoxFuture<'a, HealthRecord> {
        Box::pin(async move {
            let started = Instant::now();
            let state = self.forced_state.unwrap_or(HealthState::Healthy);
            let latency_ms = started.elapsed().as_millis() as u64;

            match state {
                HealthState::Unavailable => {
                    HealthRecord::unavailable(SOURCE_NAME, "upstream unreachable")
                }
                state => HealthRecord::new(
                    SOURCE_NAME,
                    state,
                    latency_ms,
                    self.success_rate(),
                    None,
                ),
            }
        })
    }

    fn quote<'a>(
        &'a self,
        req: QuoteRequest,
    ) -> BoxFuture<'a, Result<QuoteBatch, SourceError>> {
        Box::pin(async move {
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
        req: HistoricalRequest,
    ) -> BoxFuture<'a, Result<PriceSeries, SourceError>> {
        Box::pin(async move {
            let key = format!("historical_prices:{}:{}", req.symbol, req.range_key());
            if let Some(cached) = self.cache.get(&key).await {
                if let Ok(series) = serde_json::from_str(&cached) {
                    return Ok(series);
                }
            }

            self.limiter.acquire(1.0).await;
            let result = self.build_series(&req);
            self.track(result.is_ok());

            if let Ok(series) = &result {
                if let Ok(body) = serde_json::to_string(series) {
                    self.cache.set(key, body).await;
                }
            }
            result.map_err(|error| error.with_source(SOURCE_NAME))
        })
    }

    fn fundamentals<'a>(
        &'a self,
        req: FundamentalsRequest,
    ) -> BoxFuture<'a, Result<FundamentalsBatch, SourceError>> {
        Box::pin(async move {
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
