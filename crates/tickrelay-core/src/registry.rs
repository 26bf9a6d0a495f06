//! Adapter registry: source registration, fallback-chain management, and
//! health-aware selection.
//!
//! The registry owns the set of registered sources, an ordered fallback
//! chain, and one cached [`HealthRecord`] per source. Selection trusts a
//! cached record only while its age is below the configured health-check
//! interval; stale records are refreshed before the decision is made, so
//! staleness is bounded without probing on every call.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::contract::{
    Capability, CapabilitySet, DataSource, HealthRecord, SourceDescriptor, SourceError, SourceKind,
};
use crate::error::RegistryError;

/// Registry construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Freshness window for cached health records.
    pub health_check_interval: Duration,
    /// Probe all sources periodically in the background.
    pub auto_health_check: bool,
    /// Upper bound on a single probe; slower probes count as unavailable.
    pub probe_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(60),
            auto_health_check: true,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Descriptor + declared capabilities + last known health for one source.
#[derive(Debug, Clone)]
pub struct SourceSnapshot {
    pub descriptor: SourceDescriptor,
    pub capabilities: CapabilitySet,
    pub health: Option<HealthRecord>,
}

impl SourceSnapshot {
    pub fn status_label(&self) -> &'static str {
        match &self.health {
            Some(record) => record.state.as_str(),
            None => "unknown",
        }
    }
}

#[derive(Debug, Default)]
struct ProbeStats {
    total: u64,
    ok: u64,
}

impl ProbeStats {
    fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.ok as f64 / self.total as f64
        }
    }
}

struct RegistryInner {
    sources: HashMap<String, Arc<dyn DataSource>>,
    chain: Vec<String>,
    health: HashMap<String, HealthRecord>,
    stats: HashMap<String, ProbeStats>,
    disposed: bool,
}

impl RegistryInner {
    fn new() -> Self {
        Self {
            sources: HashMap::new(),
            chain: Vec::new(),
            health: HashMap::new(),
            stats: HashMap::new(),
            disposed: false,
        }
    }

    fn store_record(&mut self, mut record: HealthRecord) -> HealthRecord {
        let stats = self.stats.entry(record.source_name.clone()).or_default();
        stats.total += 1;
        if record.is_selectable() {
            stats.ok += 1;
        } else if record.error.is_some() {
            // Recovered probe failures report the observed probe success
            // ratio rather than a source-supplied figure.
            record.success_rate = stats.ratio();
        }

        self.health
            .insert(record.source_name.clone(), record.clone());
        record
    }
}

/// Health-aware source registry with an ordered fallback chain.
///
/// Shared freely via internal `Arc`s: the optional background sweep and any
/// number of selection calls may run concurrently; health writes are
/// last-writer-wins per source.
pub struct AdapterRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    config: RegistryConfig,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl AdapterRegistry {
    /// Create a registry. When `auto_health_check` is set the periodic probe
    /// sweep starts immediately, so construction must happen inside a tokio
    /// runtime in that case.
    pub fn new(config: RegistryConfig) -> Self {
        let registry = Self {
            inner: Arc::new(RwLock::new(RegistryInner::new())),
            config,
            sweep: Mutex::new(None),
        };
        if config.auto_health_check {
            registry.start_health_checks();
        }
        registry
    }

    /// Create a registry and register `sources` in order.
    pub async fn with_sources(
        sources: Vec<Arc<dyn DataSource>>,
        config: RegistryConfig,
    ) -> Result<Self, RegistryError> {
        let registry = Self::new(config);
        for source in sources {
            registry.register(source).await?;
        }
        Ok(registry)
    }

    /// Register a source under its descriptor name.
    ///
    /// Built-in sources append to the fallback chain (lowest priority);
    /// optional sources prepend (highest priority).
    pub async fn register(&self, source: Arc<dyn DataSource>) -> Result<(), RegistryError> {
        let descriptor = source.descriptor();
        let mut inner = self.inner.write().await;

        if inner.disposed {
            return Err(RegistryError::Disposed);
        }
        if inner.sources.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateSource {
                name: descriptor.name,
            });
        }

        match descriptor.kind {
            SourceKind::BuiltIn => inner.chain.push(descriptor.name.clone()),
            SourceKind::Optional => inner.chain.insert(0, descriptor.name.clone()),
        }
        inner.sources.insert(descriptor.name.clone(), source);
        info!(
            "registered source '{}' ({:?}), chain is now {:?}",
            descriptor.name, descriptor.kind, inner.chain
        );
        Ok(())
    }

    /// Remove a source along with its health record and chain entry.
    /// Returns `false` if the name was not registered.
    pub async fn unregister(&self, name: &str) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.sources.remove(name).is_some();
        if removed {
            inner.health.remove(name);
            inner.stats.remove(name);
            inner.chain.retain(|entry| entry != name);
            info!("unregistered source '{name}'");
        }
        removed
    }

    /// Replace the fallback chain wholesale.
    ///
    /// Atomic: any unknown or duplicated name rejects the whole operation
    /// and leaves the previous chain intact.
    pub async fn set_fallback_chain(&self, names: Vec<String>) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;

        let mut seen = HashSet::new();
        for name in &names {
            if !inner.sources.contains_key(name) {
                return Err(RegistryError::UnknownChainEntry { name: name.clone() });
            }
            if !seen.insert(name.as_str()) {
                return Err(RegistryError::DuplicateChainEntry { name: name.clone() });
            }
        }

        inner.chain = names;
        Ok(())
    }

    /// Current fallback chain order.
    pub async fn fallback_chain(&self) -> Vec<String> {
        self.inner.read().await.chain.clone()
    }

    /// Look up a registered source by name, ignoring health.
    pub async fn get_adapter_by_name(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.inner.read().await.sources.get(name).cloned()
    }

    /// Resolve a working source.
    ///
    /// A preferred name is tried before the chain and wins over chain order,
    /// but never over health. The chain is then walked in order and the
    /// first source with a fresh `Healthy` or `Degraded` record is returned;
    /// degraded sources are usable-with-reduced-confidence, not excluded.
    ///
    /// # Errors
    ///
    /// [`SourceError::unavailable`] when no registered source is selectable.
    pub async fn get_adapter(
        &self,
        preferred: Option<&str>,
    ) -> Result<Arc<dyn DataSource>, SourceError> {
        let chain = self.fallback_chain().await;

        let mut candidates = Vec::with_capacity(chain.len() + 1);
        if let Some(name) = preferred {
            candidates.push(name.to_owned());
        }
        for name in chain {
            if Some(name.as_str()) != preferred {
                candidates.push(name);
            }
        }

        for name in candidates {
            let Some(record) = self.fresh_health(&name).await else {
                continue;
            };
            if record.is_selectable() {
                if let Some(source) = self.get_adapter_by_name(&name).await {
                    return Ok(source);
                }
            } else {
                debug!(
                    "skipping source '{}' in state {} during selection",
                    name, record.state
                );
            }
        }

        Err(SourceError::unavailable(
            "no healthy data adapters available",
        ))
    }

    /// Registered sources declaring `capability`, in chain order,
    /// independent of health.
    pub async fn get_adapters_with_capability(
        &self,
        capability: Capability,
    ) -> Vec<Arc<dyn DataSource>> {
        let inner = self.inner.read().await;
        inner
            .chain
            .iter()
            .filter_map(|name| inner.sources.get(name))
            .filter(|source| source.capabilities().supports(capability))
            .cloned()
            .collect()
    }

    /// Probe one source now and store the result, replacing any prior
    /// record. Returns `None` only when `name` is not registered; probe
    /// failures are recovered into `Unavailable` records, never propagated.
    pub async fn check_health(&self, name: &str) -> Option<HealthRecord> {
        let source = self.get_adapter_by_name(name).await?;
        let record = probe_source(name, source.as_ref(), self.config.probe_timeout).await;

        let mut inner = self.inner.write().await;
        Some(inner.store_record(record))
    }

    /// Probe every registered source concurrently and store the results.
    pub async fn check_all(&self) -> Vec<HealthRecord> {
        sweep_once(&self.inner, self.config.probe_timeout).await
    }

    /// Last stored health record for `name`, regardless of freshness.
    pub async fn health_record(&self, name: &str) -> Option<HealthRecord> {
        self.inner.read().await.health.get(name).cloned()
    }

    /// One snapshot per registered source, in chain order.
    pub async fn snapshots(&self) -> Vec<SourceSnapshot> {
        let inner = self.inner.read().await;
        inner
            .chain
            .iter()
            .filter_map(|name| {
                let source = inner.sources.get(name)?;
                Some(SourceSnapshot {
                    descriptor: source.descriptor(),
                    capabilities: source.capabilities(),
                    health: inner.health.get(name).cloned(),
                })
            })
            .collect()
    }

    /// Start the periodic probe sweep. No-op if already running.
    pub fn start_health_checks(&self) {
        let mut sweep = self
            .sweep
            .lock()
            .expect("sweep handle lock should not be poisoned");
        if sweep.is_some() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let period = self.config.health_check_interval;
        let probe_timeout = self.config.probe_timeout;

        *sweep = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick fires immediately, probing at startup.
                ticker.tick().await;
                sweep_once(&inner, probe_timeout).await;
            }
        }));
    }

    /// Cancel the periodic probe sweep; no further probes fire afterwards.
    pub fn stop_health_checks(&self) {
        let handle = self
            .sweep
            .lock()
            .expect("sweep handle lock should not be poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("stopped periodic health checks");
        }
    }

    /// Stop probing and clear all sources, health records, and the chain.
    /// Terminal: the registry rejects registrations afterwards.
    pub async fn dispose(&self) {
        self.stop_health_checks();

        let mut inner = self.inner.write().await;
        inner.sources.clear();
        inner.chain.clear();
        inner.health.clear();
        inner.stats.clear();
        inner.disposed = true;
        info!("registry disposed");
    }

    /// Cached record if still within the freshness window, otherwise a
    /// fresh probe.
    async fn fresh_health(&self, name: &str) -> Option<HealthRecord> {
        {
            let inner = self.inner.read().await;
            if let Some(record) = inner.health.get(name) {
                if record.age() < self.config.health_check_interval {
                    return Some(record.clone());
                }
            }
        }
        self.check_health(name).await
    }
}

impl Drop for AdapterRegistry {
    fn drop(&mut self) {
        if let Ok(mut sweep) = self.sweep.lock() {
            if let Some(handle) = sweep.take() {
                handle.abort();
            }
        }
    }
}

/// Probe one source with a bounded timeout, recovering panics and timeouts
/// into `Unavailable` records.
async fn probe_source(name: &str, source: &dyn DataSource, probe_timeout: Duration) -> HealthRecord {
    let started = Instant::now();
    let probe = AssertUnwindSafe(source.health_check()).catch_unwind();

    match timeout(probe_timeout, probe).await {
        Ok(Ok(mut record)) => {
            // Normalize the name so a misbehaving source cannot poison
            // another source's health slot.
            record.source_name = name.to_owned();
            record
        }
        Ok(Err(panic)) => {
            let mut record = HealthRecord::unavailable(name, panic_message(panic));
            record.latency_ms = elapsed_ms(started);
            record
        }
        Err(_) => {
            let mut record = HealthRecord::unavailable(
                name,
                format!("health probe timed out after {probe_timeout:?}"),
            );
            record.latency_ms = elapsed_ms(started);
            record
        }
    }
}

async fn sweep_once(
    inner: &Arc<RwLock<RegistryInner>>,
    probe_timeout: Duration,
) -> Vec<HealthRecord> {
    let sources: Vec<(String, Arc<dyn DataSource>)> = {
        let guard = inner.read().await;
        guard
            .sources
            .iter()
            .map(|(name, source)| (name.clone(), Arc::clone(source)))
            .collect()
    };

    let probes = sources
        .iter()
        .map(|(name, source)| probe_source(name, source.as_ref(), probe_timeout));
    let records = join_all(probes).await;

    let mut guard = inner.write().await;
    records
        .into_iter()
        .map(|record| {
            let record = guard.store_record(record);
            if let Some(error) = &record.error {
                warn!("health probe for '{}' failed: {error}", record.source_name);
            }
            record
        })
        .collect()
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("health probe panicked")
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{
        BoxFuture, FundamentalsBatch, FundamentalsRequest, HealthState, HistoricalRequest,
        Operation, QuoteBatch, QuoteRequest,
    };
    use crate::PriceSeries;

    /// Minimal scripted source for registry behavior tests.
    #[derive(Debug)]
    struct ScriptedSource {
        descriptor: SourceDescriptor,
        state: HealthState,
        panic_on_probe: bool,
        probe_delay: Option<Duration>,
    }

    impl ScriptedSource {
        fn built_in(name: &str, state: HealthState) -> Arc<Self> {
            Arc::new(Self {
                descriptor: SourceDescriptor::built_in(name),
                state,
                panic_on_probe: false,
                probe_delay: None,
            })
        }

        fn optional(name: &str, state: HealthState) -> Arc<Self> {
            Arc::new(Self {
                descriptor: SourceDescriptor::optional(name),
                state,
                panic_on_probe: false,
                probe_delay: None,
            })
        }

        fn panicking(name: &str) -> Arc<Self> {
            Arc::new(Self {
                descriptor: SourceDescriptor::built_in(name),
                state: HealthState::Healthy,
                panic_on_probe: true,
                probe_delay: None,
            })
        }

        fn slow(name: &str, probe_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                descriptor: SourceDescriptor::built_in(name),
                state: HealthState::Healthy,
                panic_on_probe: false,
                probe_delay: Some(probe_delay),
            })
        }
    }

    impl DataSource for ScriptedSource {
        fn descriptor(&self) -> SourceDescriptor {
            self.descriptor.clone()
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::core()
        }

        fn health_check<'a>(&'a self) -> BoxFuture<'a, HealthRecord> {
            Box::pin(async move {
                if let Some(delay) = self.probe_delay {
                    tokio::time::sleep(delay).await;
                }
                if self.panic_on_probe {
                    panic!("probe exploded");
                }
                HealthRecord::new(self.descriptor.name.clone(), self.state, 3, 1.0, None)
            })
        }

        fn quote<'a>(
            &'a self,
            _req: QuoteRequest,
        ) -> BoxFuture<'a, Result<QuoteBatch, SourceError>> {
            Box::pin(async { Ok(QuoteBatch { quotes: Vec::new() }) })
        }

        fn historical_prices<'a>(
            &'a self,
            _req: HistoricalRequest,
        ) -> BoxFuture<'a, Result<PriceSeries, SourceError>> {
            Box::pin(async {
                Err(SourceError::unsupported_operation(Operation::HistoricalPrices))
            })
        }

        fn fundamentals<'a>(
            &'a self,
            _req: FundamentalsRequest,
        ) -> BoxFuture<'a, Result<FundamentalsBatch, SourceError>> {
            Box::pin(async {
                Err(SourceError::unsupported_operation(Operation::Fundamentals))
            })
        }
    }

    fn manual_config() -> RegistryConfig {
        let _ = env_logger::builder().is_test(true).try_init();
        RegistryConfig {
            auto_health_check: false,
            ..RegistryConfig::default()
        }
    }

    #[tokio::test]
    async fn built_in_appends_and_optional_prepends() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Healthy))
            .await
            .expect("register yahoo");
        registry
            .register(ScriptedSource::built_in("stooq", HealthState::Healthy))
            .await
            .expect("register stooq");
        registry
            .register(ScriptedSource::optional("alphavantage", HealthState::Healthy))
            .await
            .expect("register alphavantage");

        assert_eq!(
            registry.fallback_chain().await,
            vec!["alphavantage", "yahoo", "stooq"]
        );
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected_without_mutation() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Healthy))
            .await
            .expect("first registration");
        let err = registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Degraded))
            .await
            .expect_err("duplicate must fail");

        assert!(matches!(err, RegistryError::DuplicateSource { .. }));
        assert_eq!(registry.fallback_chain().await, vec!["yahoo"]);
    }

    #[tokio::test]
    async fn unregister_removes_source_and_chain_entry() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Healthy))
            .await
            .expect("register");
        assert!(registry.unregister("yahoo").await);
        assert!(!registry.unregister("yahoo").await);

        assert!(registry.get_adapter_by_name("yahoo").await.is_none());
        assert!(registry.fallback_chain().await.is_empty());
    }

    #[tokio::test]
    async fn chain_replacement_is_atomic() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Healthy))
            .await
            .expect("register yahoo");
        registry
            .register(ScriptedSource::built_in("stooq", HealthState::Healthy))
            .await
            .expect("register stooq");

        let err = registry
            .set_fallback_chain(vec![String::from("stooq"), String::from("missing")])
            .await
            .expect_err("unknown entry must fail");
        assert!(matches!(err, RegistryError::UnknownChainEntry { .. }));
        assert_eq!(registry.fallback_chain().await, vec!["yahoo", "stooq"]);

        registry
            .set_fallback_chain(vec![String::from("stooq"), String::from("yahoo")])
            .await
            .expect("valid replacement");
        assert_eq!(registry.fallback_chain().await, vec!["stooq", "yahoo"]);
    }

    #[tokio::test]
    async fn selection_skips_unavailable_and_returns_first_selectable() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("a", HealthState::Unavailable))
            .await
            .expect("register a");
        registry
            .register(ScriptedSource::built_in("b", HealthState::Healthy))
            .await
            .expect("register b");

        let selected = registry.get_adapter(None).await.expect("selection");
        assert_eq!(selected.descriptor().name, "b");
    }

    #[tokio::test]
    async fn preferred_source_loses_to_health_but_beats_chain_order() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("a", HealthState::Unavailable))
            .await
            .expect("register a");
        registry
            .register(ScriptedSource::built_in("b", HealthState::Healthy))
            .await
            .expect("register b");
        registry
            .register(ScriptedSource::built_in("c", HealthState::Healthy))
            .await
            .expect("register c");

        // Unavailable preferred falls back to the chain.
        let selected = registry.get_adapter(Some("a")).await.expect("selection");
        assert_eq!(selected.descriptor().name, "b");

        // Healthy preferred wins even when listed later in the chain.
        let selected = registry.get_adapter(Some("c")).await.expect("selection");
        assert_eq!(selected.descriptor().name, "c");
    }

    #[tokio::test]
    async fn degraded_source_is_selected_when_nothing_is_healthy() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("a", HealthState::Unavailable))
            .await
            .expect("register a");
        registry
            .register(ScriptedSource::built_in("b", HealthState::Degraded))
            .await
            .expect("register b");

        let selected = registry.get_adapter(None).await.expect("selection");
        assert_eq!(selected.descriptor().name, "b");
    }

    #[tokio::test]
    async fn exhausted_selection_fails_with_unavailable() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("a", HealthState::Unavailable))
            .await
            .expect("register a");

        let err = registry.get_adapter(None).await.expect_err("must fail");
        assert_eq!(err.code(), "source.unavailable");
        assert!(err.retryable());
    }

    #[tokio::test]
    async fn check_health_on_missing_source_returns_none() {
        let registry = AdapterRegistry::new(manual_config());
        assert!(registry.check_health("missing").await.is_none());
    }

    #[tokio::test]
    async fn panicking_probe_is_recorded_not_propagated() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::panicking("flaky"))
            .await
            .expect("register");

        let record = registry.check_health("flaky").await.expect("record");
        assert_eq!(record.state, HealthState::Unavailable);
        assert_eq!(record.error.as_deref(), Some("probe exploded"));
    }

    #[tokio::test]
    async fn probe_exceeding_timeout_is_recorded_unavailable() {
        let registry = AdapterRegistry::new(RegistryConfig {
            probe_timeout: Duration::from_millis(50),
            ..manual_config()
        });

        registry
            .register(ScriptedSource::slow("tarpit", Duration::from_secs(30)))
            .await
            .expect("register");

        let record = registry.check_health("tarpit").await.expect("record");
        assert_eq!(record.state, HealthState::Unavailable);
        assert!(
            record
                .error
                .as_deref()
                .expect("error message")
                .contains("timed out"),
            "error: {:?}",
            record.error
        );

        // A source that never answers its probe is never selected.
        let err = registry.get_adapter(None).await.expect_err("must fail");
        assert_eq!(err.code(), "source.unavailable");
    }

    #[tokio::test]
    async fn fresh_record_short_circuits_reprobing() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Healthy))
            .await
            .expect("register");

        registry.check_health("yahoo").await.expect("probe");
        let first = registry.health_record("yahoo").await.expect("record");

        registry.get_adapter(None).await.expect("selection");
        let second = registry.health_record("yahoo").await.expect("record");

        // Selection reused the cached record instead of probing again.
        assert_eq!(first.checked_at, second.checked_at);
    }

    #[tokio::test]
    async fn capability_filter_ignores_health() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("a", HealthState::Unavailable))
            .await
            .expect("register a");
        registry
            .register(ScriptedSource::built_in("b", HealthState::Healthy))
            .await
            .expect("register b");

        let quotes = registry
            .get_adapters_with_capability(Capability::Quotes)
            .await;
        assert_eq!(quotes.len(), 2);

        let news = registry.get_adapters_with_capability(Capability::News).await;
        assert!(news.is_empty());
    }

    #[tokio::test]
    async fn dispose_is_terminal() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Healthy))
            .await
            .expect("register");
        registry.dispose().await;

        assert!(registry.fallback_chain().await.is_empty());
        assert!(registry.get_adapter_by_name("yahoo").await.is_none());

        let err = registry
            .register(ScriptedSource::built_in("yahoo", HealthState::Healthy))
            .await
            .expect_err("post-dispose registration must fail");
        assert!(matches!(err, RegistryError::Disposed));
    }

    #[tokio::test]
    async fn check_all_probes_every_source() {
        let registry = AdapterRegistry::new(manual_config());

        registry
            .register(ScriptedSource::built_in("a", HealthState::Healthy))
            .await
            .expect("register a");
        registry
            .register(ScriptedSource::built_in("b", HealthState::Degraded))
            .await
            .expect("register b");

        let records = registry.check_all().await;
        assert_eq!(records.len(), 2);
        assert!(registry.health_record("a").await.is_some());
        assert!(registry.health_record("b").await.is_some());
    }
}
