//! Contract grid: every shipped adapter must honor the full source
//! contract, including failing fast on operations it does not declare.

use std::sync::Arc;

use tickrelay_core::{
    AlphaVantageSource, Capability, DataSource, FundamentalsRequest, HealthState,
    HistoricalRequest, Interval, QuoteRequest, SourceErrorKind, SourceKind, Symbol, UtcDateTime,
    YahooSource,
};

struct SourceCase {
    name: &'static str,
    source: Arc<dyn DataSource>,
}

fn source_cases() -> Vec<SourceCase> {
    vec![
        SourceCase {
            name: "yahoo",
            source: Arc::new(YahooSource::default()),
        },
        SourceCase {
            name: "alphavantage",
            source: Arc::new(AlphaVantageSource::with_api_key("demo")),
        },
    ]
}

#[tokio::test]
async fn descriptor_name_matches_case_and_kind_is_consistent() {
    for case in source_cases() {
        let descriptor = case.source.descriptor();
        assert_eq!(descriptor.name, case.name);
        match descriptor.kind {
            SourceKind::BuiltIn => assert!(!descriptor.requires_setup, "{}", case.name),
            SourceKind::Optional => assert!(descriptor.requires_setup, "{}", case.name),
        }
    }
}

#[tokio::test]
async fn every_source_declares_quotes_and_serves_them() {
    let request =
        QuoteRequest::new(vec![Symbol::parse("AAPL").expect("valid symbol")]).expect("request");

    for case in source_cases() {
        assert!(
            case.source.capabilities().supports(Capability::Quotes),
            "source '{}': quotes capability",
            case.name
        );

        let batch = case
            .source
            .quote(request.clone())
            .await
            .unwrap_or_else(|error| panic!("source '{}' quote failed: {error}", case.name));
        assert_eq!(batch.quotes.len(), 1, "source '{}': quote count", case.name);

        let quote = &batch.quotes[0];
        assert_eq!(quote.symbol.as_str(), "AAPL", "source '{}'", case.name);
        assert!(quote.price > 0.0, "source '{}': positive price", case.name);
        assert_eq!(quote.currency, "USD", "source '{}': currency", case.name);
    }
}

#[tokio::test]
async fn historical_outcome_tracks_declared_capability() {
    let start = UtcDateTime::parse("2025-04-01T00:00:00Z").expect("start");
    let end = UtcDateTime::parse("2025-04-03T00:00:00Z").expect("end");
    let request = HistoricalRequest::new(
        Symbol::parse("MSFT").expect("valid symbol"),
        Interval::OneDay,
        start,
        end,
    )
    .expect("request");

    for case in source_cases() {
        let supported = case.source.capabilities().supports(Capability::Historical);
        let result = case.source.historical_prices(request.clone()).await;

        if supported {
            let series = result.unwrap_or_else(|error| {
                panic!("source '{}' historical failed: {error}", case.name)
            });
            assert_eq!(series.symbol.as_str(), "MSFT", "source '{}'", case.name);
            assert_eq!(series.interval, Interval::OneDay, "source '{}'", case.name);
            assert!(!series.bars.is_empty(), "source '{}': bars", case.name);
            for window in series.bars.windows(2) {
                assert!(
                    window[0].ts < window[1].ts,
                    "source '{}': bars must be time-ordered",
                    case.name
                );
            }
        } else {
            let err = result.expect_err("undeclared historical must fail");
            assert_eq!(
                err.kind(),
                SourceErrorKind::UnsupportedOperation,
                "source '{}'",
                case.name
            );
            assert_eq!(err.source_name(), Some(case.name));
            assert!(!err.retryable(), "source '{}'", case.name);
        }
    }
}

#[tokio::test]
async fn fundamentals_outcome_tracks_declared_capability() {
    let request = FundamentalsRequest::new(vec![Symbol::parse("NVDA").expect("valid symbol")])
        .expect("request");

    for case in source_cases() {
        let supported = case
            .source
            .capabilities()
            .supports(Capability::Fundamentals);
        let result = case.source.fundamentals(request.clone()).await;

        if supported {
            let batch = result.unwrap_or_else(|error| {
                panic!("source '{}' fundamentals failed: {error}", case.name)
            });
            assert_eq!(batch.fundamentals.len(), 1, "source '{}'", case.name);
            assert_eq!(
                batch.fundamentals[0].symbol.as_str(),
                "NVDA",
                "source '{}'",
                case.name
            );
        } else {
            let err = result.expect_err("undeclared fundamentals must fail");
            assert_eq!(err.kind(), SourceErrorKind::UnsupportedOperation);
        }
    }
}

#[tokio::test]
async fn health_probe_reports_own_name_and_never_fails() {
    for case in source_cases() {
        let record = case.source.health_check().await;
        assert_eq!(record.source_name, case.name);
        assert!(record.is_selectable(), "source '{}'", case.name);
        assert!(
            (0.0..=1.0).contains(&record.success_rate),
            "source '{}': success rate in range",
            case.name
        );
    }
}

#[tokio::test]
async fn repeat_requests_are_deterministic() {
    let request =
        QuoteRequest::new(vec![Symbol::parse("SPY").expect("valid symbol")]).expect("request");

    for case in source_cases() {
        let first = case
            .source
            .quote(request.clone())
            .await
            .unwrap_or_else(|error| panic!("source '{}' quote failed: {error}", case.name));
        let second = case
            .source
            .quote(request.clone())
            .await
            .unwrap_or_else(|error| panic!("source '{}' quote failed: {error}", case.name));

        assert_eq!(
            first.quotes[0].price, second.quotes[0].price,
            "source '{}': price stability",
            case.name
        );
    }
}

#[tokio::test]
async fn unconfigured_optional_source_degrades_instead_of_panicking() {
    let source = AlphaVantageSource::default();

    let record = source.health_check().await;
    assert_eq!(record.state, HealthState::Unavailable);
    assert!(record.error.is_some());

    let request =
        QuoteRequest::new(vec![Symbol::parse("AAPL").expect("valid symbol")]).expect("request");
    let err = source.quote(request).await.expect_err("must fail");
    assert_eq!(err.kind(), SourceErrorKind::Unavailable);
    assert!(err.retryable());
}
