//! Request orchestration with graceful degradation.
//!
//! [`CandleService`] asks its [`SampleSource`] for samples, runs them through
//! the candle engine and, when the source fails, times out or yields nothing
//! usable, answers with a synthetic series flagged as degraded. Callers always
//! get a chartable result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_REQUEST_TIMEOUT_MS;
use crate::data_source::{
    HealthStatus, MarketsRequest, SampleRequest, SampleSource, SourceError,
};
use crate::engine::{candles_from_samples, synthetic_series};
use crate::portfolio::{Investment, Portfolio, PortfolioValuation};
use crate::snapshot::market_snapshot;
use crate::{CandleSeries, CoinId, MarketCoin, MarketStats, ProviderId, Timeframe, UtcDateTime};

type Clock = Arc<dyn Fn() -> UtcDateTime + Send + Sync>;

/// Candles for one coin and timeframe, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleResponse {
    pub coin: CoinId,
    pub timeframe: Timeframe,
    pub candles: CandleSeries,
    /// True when `candles` were synthesized instead of derived from samples.
    pub degraded: bool,
    pub skipped_samples: usize,
    pub provider: ProviderId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub source_error: Option<SourceError>,
}

/// Market overview rows with derived totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketResponse {
    pub coins: Vec<MarketCoin>,
    pub stats: MarketStats,
    pub degraded: bool,
    pub provider: ProviderId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub source_error: Option<SourceError>,
}

/// Simulated portfolio priced against the market overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioResponse {
    pub valuation: PortfolioValuation,
    /// True when prices came from the built-in snapshot.
    pub degraded: bool,
    pub provider: ProviderId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub source_error: Option<SourceError>,
}

/// Entry point for candle and market requests.
pub struct CandleService<S> {
    source: S,
    timeout: Duration,
    seed: Option<u64>,
    clock: Clock,
}

impl<S> std::fmt::Debug for CandleService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleService")
            .field("timeout", &self.timeout)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl<S: SampleSource> CandleService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            seed: None,
            clock: Arc::new(UtcDateTime::now),
        }
    }

    /// Upper bound on each source call, retries included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fixes the fallback generator seed so degraded output is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> UtcDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get_candles(&self, coin: &CoinId, timeframe: Timeframe) -> CandleResponse {
        self.get_candles_with_reference(coin, timeframe, None).await
    }

    /// Like [`get_candles`](Self::get_candles); a finite positive
    /// `reference_price` anchors synthetic candles when the fallback is used.
    pub async fn get_candles_with_reference(
        &self,
        coin: &CoinId,
        timeframe: Timeframe,
        reference_price: Option<f64>,
    ) -> CandleResponse {
        let request = SampleRequest::for_timeframe(coin.clone(), timeframe);
        let provider = self.source.id();

        let (error, skipped_samples) = match self.bounded(self.source.samples(request)).await {
            Ok(batch) => {
                let output = candles_from_samples(&batch.samples, timeframe);
                if !output.candles.is_empty() {
                    return CandleResponse {
                        coin: coin.clone(),
                        timeframe,
                        candles: output.candles,
                        degraded: false,
                        skipped_samples: output.skipped,
                        provider,
                        warnings: Vec::new(),
                        source_error: None,
                    };
                }

                let error = if batch.samples.is_empty() {
                    SourceError::empty(format!("{provider} returned no samples for {coin}"))
                } else {
                    SourceError::empty(format!(
                        "{provider} returned no usable samples for {coin} ({} skipped)",
                        output.skipped
                    ))
                };
                (error, output.skipped)
            }
            Err(error) => (error, 0),
        };

        warn!(
            %coin,
            %timeframe,
            code = error.code(),
            error = error.message(),
            "serving synthetic candles"
        );

        let mut rng = self.rng();
        let candles = synthetic_series(timeframe, reference_price, (self.clock)(), &mut rng);

        CandleResponse {
            coin: coin.clone(),
            timeframe,
            candles,
            degraded: true,
            skipped_samples,
            provider: ProviderId::Synthetic,
            warnings: vec![degraded_warning(&error, "synthetic candles")],
            source_error: Some(error),
        }
    }

    /// Market overview; falls back to the built-in snapshot.
    pub async fn markets(&self) -> MarketResponse {
        let provider = self.source.id();

        let error = match self.bounded(self.source.markets(MarketsRequest::default())).await {
            Ok(batch) if !batch.coins.is_empty() => {
                debug!(coins = batch.coins.len(), "market overview from source");
                let stats = MarketStats::from_coins(&batch.coins);
                return MarketResponse {
                    coins: batch.coins,
                    stats,
                    degraded: false,
                    provider,
                    warnings: Vec::new(),
                    source_error: None,
                };
            }
            Ok(_) => SourceError::empty(format!("{provider} returned no market rows")),
            Err(error) => error,
        };

        warn!(code = error.code(), error = error.message(), "serving market snapshot");

        let coins = market_snapshot();
        let stats = MarketStats::from_coins(&coins);
        MarketResponse {
            coins,
            stats,
            degraded: true,
            provider: ProviderId::Synthetic,
            warnings: vec![degraded_warning(&error, "built-in market snapshot")],
            source_error: Some(error),
        }
    }

    /// Buys each investment at its entry price, or at the market price when
    /// none is given, then values the result at market prices. Prices come
    /// from [`markets`](Self::markets), so the snapshot stands in when the
    /// source is down.
    pub async fn portfolio(&self, investments: &[Investment]) -> PortfolioResponse {
        let market = self.markets().await;
        let mut warnings = market.warnings;
        let mut portfolio = Portfolio::new();

        for investment in investments {
            let price = investment.entry_price.or_else(|| {
                market
                    .coins
                    .iter()
                    .find(|coin| coin.id == investment.coin)
                    .map(|coin| coin.price)
            });
            let Some(price) = price else {
                warnings.push(format!(
                    "portfolio.unpriced: no market price for {}; investment skipped",
                    investment.coin
                ));
                continue;
            };
            if let Err(error) = portfolio.invest(investment.coin.clone(), investment.usd, price) {
                warnings.push(format!("portfolio.invalid: {error}"));
            }
        }

        let valuation = portfolio.value(&market.coins);
        for coin in &valuation.unpriced {
            warnings.push(format!(
                "portfolio.unpriced: no market price for {coin}; left out of totals"
            ));
        }
        debug!(
            holdings = valuation.holdings.len(),
            total_current = valuation.total_current,
            "portfolio valued"
        );

        PortfolioResponse {
            valuation,
            degraded: market.degraded,
            provider: market.provider,
            warnings,
            source_error: market.source_error,
        }
    }

    pub async fn health(&self) -> HealthStatus {
        self.source.health().await
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, SourceError>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::timeout(format!(
                "{} did not answer within {}ms",
                self.source.id(),
                self.timeout.as_millis()
            ))),
        }
    }

    fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}

fn degraded_warning(error: &SourceError, substitute: &str) -> String {
    format!("{}: {}; serving {substitute}", error.code(), error.message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{HealthState, MarketBatch, SampleBatch};
    use crate::Sample;
    use std::pin::Pin;

    enum Behavior {
        Samples(Vec<Sample>),
        Fail(SourceError),
        Hang,
    }

    struct StubSource {
        behavior: Behavior,
    }

    impl SampleSource for StubSource {
        fn id(&self) -> ProviderId {
            ProviderId::Coingecko
        }

        fn samples<'a>(
            &'a self,
            req: SampleRequest,
        ) -> Pin<Box<dyn Future<Output = Result<SampleBatch, SourceError>> + Send + 'a>> {
            Box::pin(async move {
                match &self.behavior {
                    Behavior::Samples(samples) => Ok(SampleBatch {
                        coin: req.coin,
                        samples: samples.clone(),
                    }),
                    Behavior::Fail(error) => Err(error.clone()),
                    Behavior::Hang => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Err(SourceError::internal("unreachable"))
                    }
                }
            })
        }

        fn markets<'a>(
            &'a self,
            _req: MarketsRequest,
        ) -> Pin<Box<dyn Future<Output = Result<MarketBatch, SourceError>> + Send + 'a>> {
            Box::pin(async move {
                match &self.behavior {
                    Behavior::Fail(error) => Err(error.clone()),
                    _ => Ok(MarketBatch { coins: Vec::new() }),
                }
            })
        }

        fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
            Box::pin(async move { HealthStatus::new(HealthState::Degraded, true) })
        }
    }

    fn ts(input: &str) -> UtcDateTime {
        UtcDateTime::parse(input).expect("timestamp")
    }

    fn service(behavior: Behavior) -> CandleService<StubSource> {
        CandleService::new(StubSource { behavior })
            .with_clock(|| ts("2024-06-15T12:00:00Z"))
            .with_seed(42)
    }

    fn bitcoin() -> CoinId {
        CoinId::parse("bitcoin").expect("valid id")
    }

    #[tokio::test]
    async fn real_samples_are_not_degraded() {
        let samples = vec![
            Sample::new(ts("2024-06-15T10:00:00Z"), 100.0, Some(1.0)),
            Sample::new(ts("2024-06-15T10:30:00Z"), 101.0, Some(2.0)),
            Sample::new(ts("2024-06-15T11:00:00Z"), f64::NAN, Some(3.0)),
        ];

        let response = service(Behavior::Samples(samples))
            .get_candles(&bitcoin(), Timeframe::OneHour)
            .await;

        assert!(!response.degraded);
        assert_eq!(response.provider, ProviderId::Coingecko);
        assert_eq!(response.candles.len(), 1);
        assert_eq!(response.skipped_samples, 1);
        assert!(response.warnings.is_empty());
    }

    #[tokio::test]
    async fn only_malformed_samples_fall_back_and_keep_skip_count() {
        let samples = vec![Sample::new(ts("2024-06-15T10:00:00Z"), f64::INFINITY, None)];

        let response = service(Behavior::Samples(samples))
            .get_candles(&bitcoin(), Timeframe::OneDay)
            .await;

        assert!(response.degraded);
        assert_eq!(response.skipped_samples, 1);
        assert_eq!(response.candles.len(), 30);
        assert_eq!(
            response.source_error.as_ref().map(SourceError::code),
            Some("source.empty")
        );
    }

    #[tokio::test]
    async fn source_failure_falls_back_with_warning() {
        let response = service(Behavior::Fail(SourceError::unavailable("connection refused")))
            .get_candles_with_reference(&bitcoin(), Timeframe::OneWeek, Some(81_237.0))
            .await;

        assert!(response.degraded);
        assert_eq!(response.provider, ProviderId::Synthetic);
        assert_eq!(response.candles.len(), 12);
        assert!(response.warnings[0].starts_with("source.unavailable: connection refused"));
        assert!(response
            .candles
            .iter()
            .all(|candle| (candle.close / 81_237.0 - 1.0).abs() <= 0.05));
    }

    #[tokio::test]
    async fn slow_source_times_out_into_fallback() {
        let response = service(Behavior::Hang)
            .with_timeout(Duration::from_millis(50))
            .get_candles(&bitcoin(), Timeframe::FourHours)
            .await;

        assert!(response.degraded);
        assert_eq!(response.candles.len(), 42);
        assert_eq!(
            response.source_error.as_ref().map(SourceError::code),
            Some("source.timeout")
        );
    }

    #[tokio::test]
    async fn seeded_fallback_is_reproducible() {
        let service = service(Behavior::Samples(Vec::new()));

        let first = service.get_candles(&bitcoin(), Timeframe::OneDay).await;
        let second = service.get_candles(&bitcoin(), Timeframe::OneDay).await;

        assert_eq!(first.candles, second.candles);
        assert_eq!(
            first.candles.last().map(|candle| candle.bucket_start),
            Some(ts("2024-06-15T12:00:00Z"))
        );
    }

    #[tokio::test]
    async fn empty_markets_fall_back_to_snapshot() {
        let response = service(Behavior::Samples(Vec::new())).markets().await;

        assert!(response.degraded);
        assert_eq!(response.coins.len(), 10);
        assert!(response.stats.btc_dominance > 50.0);
        assert!(response.warnings[0].contains("built-in market snapshot"));
    }

    #[tokio::test]
    async fn portfolio_uses_snapshot_prices_when_markets_are_empty() {
        let investments: Vec<Investment> = ["bitcoin=1000@40618.5", "bitcoin=1000", "no-such-coin=50"]
            .iter()
            .map(|value| value.parse().expect("valid investment"))
            .collect();

        let response = service(Behavior::Samples(Vec::new()))
            .portfolio(&investments)
            .await;

        assert!(response.degraded);
        assert_eq!(response.provider, ProviderId::Synthetic);
        let valuation = &response.valuation;
        assert_eq!(valuation.holdings.len(), 1);
        assert_eq!(valuation.total_invested, 2_000.0);
        assert!(valuation.profit_loss > 0.0);
        assert!((valuation.holdings[0].allocation_pct - 100.0).abs() < 1e-9);
        assert!(response
            .warnings
            .iter()
            .any(|warning| warning.starts_with("portfolio.unpriced: no market price for no-such-coin")));
    }

    #[tokio::test]
    async fn health_passes_through() {
        let health = service(Behavior::Hang).health().await;
        assert_eq!(health.state, HealthState::Degraded);
    }
}
