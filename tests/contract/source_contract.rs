use std::sync::Arc;
use std::time::Duration;

use coinlens_core::{
    CachedSampleSource, CoinGeckoAdapter, CoinId, HealthState, MarketsRequest, NoopHttpClient,
    HttpAuth, ProviderId, SampleRequest, SampleSource, SourceConfig, SourceErrorKind, Timeframe,
    UtcDateTime,
};

struct SourceCase {
    name: &'static str,
    source: Arc<dyn SampleSource>,
}

fn source_cases() -> Vec<SourceCase> {
    vec![
        SourceCase {
            name: "coingecko-mock",
            source: Arc::new(CoinGeckoAdapter::default()),
        },
        SourceCase {
            name: "coingecko-noop-transport",
            source: Arc::new(CoinGeckoAdapter::with_http_client(
                Arc::new(NoopHttpClient),
                HttpAuth::None,
            )),
        },
        SourceCase {
            name: "cached-coingecko",
            source: Arc::new(CachedSampleSource::new(
                CoinGeckoAdapter::default(),
                Duration::from_secs(60),
            )),
        },
        SourceCase {
            name: "offline-config",
            source: Arc::new(SourceConfig::new().with_offline(true).build_source()),
        },
    ]
}

fn coin(id: &str) -> CoinId {
    CoinId::parse(id).expect("valid coin id")
}

#[tokio::test]
async fn samples_cover_the_requested_lookback_for_all_sources() {
    for timeframe in Timeframe::ALL {
        let request = SampleRequest::for_timeframe(coin("ethereum"), timeframe);
        let lookback = time::Duration::days(i64::from(request.lookback_days));

        for case in source_cases() {
            let started = UtcDateTime::now();
            let batch = case
                .source
                .samples(request.clone())
                .await
                .unwrap_or_else(|error| panic!("source '{}' samples failed: {error}", case.name));

            assert_eq!(batch.coin.as_str(), "ethereum", "source '{}': coin", case.name);
            assert!(
                !batch.samples.is_empty(),
                "source '{}': samples for {timeframe}",
                case.name
            );
            for sample in &batch.samples {
                assert!(sample.is_well_formed(), "source '{}': sample", case.name);
                let age = started.since(sample.timestamp);
                assert!(
                    age <= lookback + time::Duration::minutes(1),
                    "source '{}': sample older than {timeframe} lookback",
                    case.name
                );
            }
        }
    }
}

#[tokio::test]
async fn zero_lookback_is_rejected_by_all_sources() {
    let request = SampleRequest {
        coin: coin("bitcoin"),
        lookback_days: 0,
        vs_currency: String::from("usd"),
    };

    for case in source_cases() {
        let error = case
            .source
            .samples(request.clone())
            .await
            .expect_err("zero lookback must fail");
        assert_eq!(
            error.kind(),
            SourceErrorKind::InvalidRequest,
            "source '{}': error kind",
            case.name
        );
        assert!(!error.retryable(), "source '{}': retryable", case.name);
    }
}

#[tokio::test]
async fn markets_are_ranked_and_uppercased_for_all_sources() {
    for case in source_cases() {
        let batch = case
            .source
            .markets(MarketsRequest::default())
            .await
            .unwrap_or_else(|error| panic!("source '{}' markets failed: {error}", case.name));

        assert!(!batch.coins.is_empty(), "source '{}': coins", case.name);
        for coin in &batch.coins {
            assert_eq!(
                coin.symbol,
                coin.symbol.to_ascii_uppercase(),
                "source '{}': symbol case",
                case.name
            );
            assert!(coin.price > 0.0, "source '{}': price", case.name);
        }
        assert!(
            batch
                .coins
                .windows(2)
                .all(|pair| pair[0].market_cap >= pair[1].market_cap),
            "source '{}': market cap order",
            case.name
        );
    }
}

#[tokio::test]
async fn sources_identify_as_coingecko_and_report_healthy() {
    for case in source_cases() {
        assert_eq!(case.source.id(), ProviderId::Coingecko, "source '{}'", case.name);
        let health = case.source.health().await;
        assert_eq!(health.state, HealthState::Healthy, "source '{}'", case.name);
        assert!(health.rate_available, "source '{}'", case.name);
    }
}
