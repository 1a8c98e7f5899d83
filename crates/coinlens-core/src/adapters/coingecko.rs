use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::Duration;
use tracing::{debug, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::data_source::{
    HealthState, HealthStatus, MarketBatch, MarketsRequest, SampleBatch, SampleRequest,
    SampleSource, SourceError,
};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, NoopHttpClient};
use crate::snapshot::{market_snapshot, snapshot_price};
use crate::throttling::{RatePolicy, Throttle};
use crate::{CoinId, MarketCoin, ProviderId, Sample, UtcDateTime};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEMO_KEY_HEADER: &str = "x-cg-demo-api-key";
const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = crate::config::DEFAULT_REQUEST_TIMEOUT_MS / 2;

/// CoinGecko adapter supporting both real API calls and mock mode.
///
/// Mock mode is selected when the HTTP client reports itself as a mock; the
/// adapter then serves deterministic samples seeded from the coin id instead
/// of parsing upstream payloads.
#[derive(Clone)]
pub struct CoinGeckoAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
    request_timeout: std::time::Duration,
    circuit_breaker: Arc<CircuitBreaker>,
    throttle: Throttle,
    use_real_api: bool,
}

impl std::fmt::Debug for CoinGeckoAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoAdapter")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("use_real_api", &self.use_real_api)
            .field("circuit", &self.circuit_breaker.state())
            .finish_non_exhaustive()
    }
}

impl Default for CoinGeckoAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
            auth: HttpAuth::None,
            base_url: String::from(DEFAULT_BASE_URL),
            request_timeout: std::time::Duration::from_millis(DEFAULT_ATTEMPT_TIMEOUT_MS),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            throttle: Throttle::new(&RatePolicy::coingecko_demo()),
            use_real_api: false,
        }
    }
}

impl CoinGeckoAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, auth: HttpAuth) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            auth,
            use_real_api,
            ..Self::default()
        }
    }

    /// Attaches the optional demo API key as a request header.
    pub fn with_api_key(self, api_key: Option<&str>) -> Self {
        let auth = match api_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => HttpAuth::ApiKey {
                header: DEMO_KEY_HEADER,
                key: key.to_owned(),
            },
            None => HttpAuth::None,
        };
        Self { auth, ..self }
    }

    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, ..self }
    }

    /// Per-attempt HTTP timeout; retries each get a fresh one.
    pub fn with_request_timeout(self, request_timeout: std::time::Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    pub fn with_rate_policy(self, policy: &RatePolicy) -> Self {
        Self {
            throttle: Throttle::new(policy),
            ..self
        }
    }

    pub fn with_circuit_breaker(self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            circuit_breaker,
            ..self
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn is_real_client(&self) -> bool {
        self.use_real_api
    }

    /// Sends `request`, retrying retryable failures with the policy backoff.
    async fn fetch_body(&self, request: HttpRequest) -> Result<String, SourceError> {
        let mut attempt = 0_u32;
        loop {
            if !self.circuit_breaker.allow_request() {
                return Err(SourceError::unavailable(
                    "coingecko circuit breaker is open; skipping upstream call",
                ));
            }
            self.throttle.try_acquire().map_err(|wait| {
                SourceError::rate_limited(format!(
                    "coingecko request budget exhausted; retry in {}ms",
                    wait.as_millis()
                ))
            })?;

            let error = match self.send_once(request.clone()).await {
                Ok(body) => {
                    self.circuit_breaker.record_success();
                    return Ok(body);
                }
                Err(error) => error,
            };

            if !error.retryable() {
                return Err(error);
            }
            self.circuit_breaker.record_failure();
            let Some(delay) = self.throttle.backoff().delay_for(attempt) else {
                return Err(error);
            };
            attempt += 1;
            warn!(
                url = %request.url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying coingecko request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(&self, request: HttpRequest) -> Result<String, SourceError> {
        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("coingecko transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("coingecko transport error: {}", error.message()))
            }
        })?;

        if response.is_success() {
            return Ok(response.body);
        }
        match response.status {
            429 => Err(SourceError::rate_limited(
                "coingecko upstream returned status 429",
            )),
            status if status >= 500 => Err(SourceError::unavailable(format!(
                "coingecko upstream returned status {status}"
            ))),
            status => Err(SourceError::invalid_request(format!(
                "coingecko upstream returned status {status}"
            ))),
        }
    }

    fn request(&self, path: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{path}", self.base_url))
            .with_auth(&self.auth)
            .with_timeout(self.request_timeout)
    }

    async fn fetch_real_samples(&self, req: &SampleRequest) -> Result<SampleBatch, SourceError> {
        let path = format!(
            "/coins/{}/market_chart",
            urlencoding::encode(req.coin.as_str())
        );
        let request = self
            .request(&path)
            .with_query("vs_currency", req.vs_currency.as_str())
            .with_query("days", req.lookback_days.to_string());

        let body = self.fetch_body(request).await?;
        let samples = parse_market_chart(&body)?;
        debug!(
            coin = %req.coin,
            days = req.lookback_days,
            samples = samples.len(),
            "fetched coingecko market chart"
        );

        Ok(SampleBatch {
            coin: req.coin.clone(),
            samples,
        })
    }

    async fn fetch_real_markets(&self, req: &MarketsRequest) -> Result<MarketBatch, SourceError> {
        let request = self
            .request("/coins/markets")
            .with_query("vs_currency", req.vs_currency.as_str())
            .with_query("order", "market_cap_desc")
            .with_query("per_page", req.per_page.to_string())
            .with_query("page", "1")
            .with_query("sparkline", "false")
            .with_query("price_change_percentage", "24h,7d");

        let body = self.fetch_body(request).await?;
        let coins = parse_markets(&body)?;
        debug!(coins = coins.len(), "fetched coingecko markets");

        Ok(MarketBatch { coins })
    }

    fn fetch_fake_samples(&self, req: &SampleRequest) -> Result<SampleBatch, SourceError> {
        let seed = coin_seed(&req.coin);
        let base = snapshot_price(&req.coin).unwrap_or(90.0 + (seed % 350) as f64 / 10.0);
        let step = chart_granularity(req.lookback_days);
        let count = (Duration::days(i64::from(req.lookback_days)).whole_minutes()
            / step.whole_minutes()) as usize;
        let now = UtcDateTime::now();

        let samples = (0..count)
            .map(|index| {
                let steps_back = count.saturating_sub(index + 1) as i32;
                let timestamp = now.saturating_sub(step * steps_back);
                let wave = ((seed + index as u64) % 200) as f64 / 10_000.0 - 0.01;
                let volume = 1_000_000.0 + ((seed + index as u64 * 25) % 5_000) as f64 * 100.0;
                Sample::new(timestamp, base * (1.0 + wave), Some(volume))
            })
            .collect();

        Ok(SampleBatch {
            coin: req.coin.clone(),
            samples,
        })
    }

    fn fetch_fake_markets(&self, req: &MarketsRequest) -> MarketBatch {
        let mut coins = market_snapshot();
        coins.truncate(req.per_page as usize);
        MarketBatch { coins }
    }
}

impl SampleSource for CoinGeckoAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Coingecko
    }

    fn samples<'a>(
        &'a self,
        req: SampleRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SampleBatch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if req.lookback_days == 0 {
                return Err(SourceError::invalid_request(
                    "coingecko sample request lookback must be at least one day",
                ));
            }

            if self.is_real_client() {
                self.fetch_real_samples(&req).await
            } else {
                self.fetch_fake_samples(&req)
            }
        })
    }

    fn markets<'a>(
        &'a self,
        req: MarketsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketBatch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if req.per_page == 0 {
                return Err(SourceError::invalid_request(
                    "coingecko markets per_page must be greater than zero",
                ));
            }

            if self.is_real_client() {
                self.fetch_real_markets(&req).await
            } else {
                Ok(self.fetch_fake_markets(&req))
            }
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move {
            match self.circuit_breaker.state() {
                CircuitState::Closed => HealthStatus::healthy(),
                CircuitState::HalfOpen => HealthStatus::new(HealthState::Degraded, true),
                CircuitState::Open => HealthStatus::new(HealthState::Unhealthy, false),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct MarketChartPayload {
    #[serde(default)]
    prices: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    total_volumes: Vec<(f64, Option<f64>)>,
}

#[derive(Debug, Deserialize)]
struct MarketRowPayload {
    id: String,
    name: String,
    symbol: String,
    #[serde(default)]
    image: Option<String>,
    market_cap_rank: Option<u32>,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    ath: Option<f64>,
}

/// Joins the `prices` and `total_volumes` series of a market-chart payload on
/// their millisecond timestamps.
///
/// A null price becomes NaN so the candle builder counts it as skipped; points
/// with an unrepresentable timestamp are dropped here.
fn parse_market_chart(body: &str) -> Result<Vec<Sample>, SourceError> {
    let payload: MarketChartPayload = serde_json::from_str(body).map_err(|error| {
        SourceError::internal(format!("failed to parse coingecko market chart: {error}"))
    })?;

    let volumes: HashMap<i64, f64> = payload
        .total_volumes
        .iter()
        .filter_map(|&(millis, volume)| Some((millis as i64, volume?)))
        .collect();

    let mut dropped = 0_usize;
    let samples: Vec<Sample> = payload
        .prices
        .iter()
        .filter_map(|&(millis, price)| {
            let millis = millis as i64;
            let Ok(timestamp) = UtcDateTime::from_unix_millis(millis) else {
                dropped += 1;
                return None;
            };
            Some(Sample::new(
                timestamp,
                price.unwrap_or(f64::NAN),
                volumes.get(&millis).copied(),
            ))
        })
        .collect();

    if dropped > 0 {
        warn!(dropped, "dropped chart points with out-of-range timestamps");
    }
    Ok(samples)
}

fn parse_markets(body: &str) -> Result<Vec<MarketCoin>, SourceError> {
    let rows: Vec<MarketRowPayload> = serde_json::from_str(body).map_err(|error| {
        SourceError::internal(format!("failed to parse coingecko markets: {error}"))
    })?;

    Ok(rows.into_iter().filter_map(normalize_market_row).collect())
}

fn normalize_market_row(row: MarketRowPayload) -> Option<MarketCoin> {
    let id = match CoinId::parse(&row.id) {
        Ok(id) => id,
        Err(error) => {
            debug!(id = %row.id, %error, "skipping market row with unusable id");
            return None;
        }
    };

    Some(MarketCoin {
        id,
        name: row.name,
        symbol: row.symbol.to_ascii_uppercase(),
        image: row.image.unwrap_or_default(),
        rank: row.market_cap_rank,
        price: row.current_price.unwrap_or(0.0),
        change_24h: row.price_change_percentage_24h,
        market_cap: row.market_cap.unwrap_or(0.0),
        volume_24h: row.total_volume.unwrap_or(0.0),
        high_24h: row.high_24h,
        low_24h: row.low_24h,
        ath: row.ath,
    })
}

/// Point spacing CoinGecko applies to market-chart data for a lookback.
fn chart_granularity(lookback_days: u32) -> Duration {
    match lookback_days {
        0..=1 => Duration::minutes(5),
        2..=90 => Duration::hours(1),
        _ => Duration::days(1),
    }
}

fn coin_seed(coin: &CoinId) -> u64 {
    coin.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::throttling::Backoff;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn responding(response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn no_retry_policy() -> RatePolicy {
        RatePolicy {
            backoff: Backoff {
                first_delay: std::time::Duration::ZERO,
                max_delay: std::time::Duration::ZERO,
                factor: 1.0,
                max_retries: 0,
            },
            ..RatePolicy::coingecko_demo()
        }
    }

    fn adapter_for(client: Arc<RecordingHttpClient>) -> CoinGeckoAdapter {
        CoinGeckoAdapter::with_http_client(client, HttpAuth::None)
            .with_base_url("https://cg.test/api/v3/")
            .with_rate_policy(&no_retry_policy())
    }

    fn bitcoin() -> CoinId {
        CoinId::parse("bitcoin").expect("valid id")
    }

    #[tokio::test]
    async fn market_chart_request_carries_days_and_demo_key() {
        let client = Arc::new(RecordingHttpClient::responding(Ok(HttpResponse::ok_json(
            r#"{"prices":[],"total_volumes":[]}"#,
        ))));
        let adapter = adapter_for(Arc::clone(&client)).with_api_key(Some("demo-key"));
        let request = SampleRequest::new(bitcoin(), 30, "usd").expect("valid request");

        adapter.samples(request).await.expect("call should succeed");

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].full_url(),
            "https://cg.test/api/v3/coins/bitcoin/market_chart?vs_currency=usd&days=30"
        );
        assert_eq!(
            requests[0].headers.get(DEMO_KEY_HEADER).map(String::as_str),
            Some("demo-key")
        );
    }

    #[tokio::test]
    async fn joins_prices_and_volumes_on_timestamp() {
        let body = r#"{
            "prices": [[1718445600000, 66000.5], [1718449200000, 66100.0], [1718452800000, null]],
            "market_caps": [[1718445600000, 1.3e12]],
            "total_volumes": [[1718445600000, 2.5e10], [1718452800000, 2.7e10]]
        }"#;
        let client = Arc::new(RecordingHttpClient::responding(Ok(HttpResponse::ok_json(
            body,
        ))));
        let adapter = adapter_for(client);
        let request = SampleRequest::new(bitcoin(), 1, "usd").expect("valid request");

        let batch = adapter.samples(request).await.expect("call should succeed");

        assert_eq!(batch.samples.len(), 3);
        assert_eq!(batch.samples[0].price, 66000.5);
        assert_eq!(batch.samples[0].volume, Some(2.5e10));
        assert_eq!(batch.samples[1].volume, None);
        assert!(batch.samples[2].price.is_nan());
        assert_eq!(
            batch.samples[0].timestamp.format_rfc3339(),
            "2024-06-15T10:00:00Z"
        );
    }

    #[tokio::test]
    async fn markets_request_uses_listing_parameters_and_uppercases_symbols() {
        let body = r#"[{
            "id": "bitcoin", "name": "Bitcoin", "symbol": "btc",
            "image": "https://img.test/btc.png", "market_cap_rank": 1,
            "current_price": 81237, "price_change_percentage_24h": -2.1,
            "market_cap": 1.6e12, "total_volume": 5.6e10,
            "high_24h": 84368, "low_24h": 80898, "ath": 126080
        }]"#;
        let client = Arc::new(RecordingHttpClient::responding(Ok(HttpResponse::ok_json(
            body,
        ))));
        let adapter = adapter_for(Arc::clone(&client));

        let batch = adapter
            .markets(MarketsRequest::default())
            .await
            .expect("call should succeed");

        assert_eq!(batch.coins.len(), 1);
        assert_eq!(batch.coins[0].symbol, "BTC");
        assert_eq!(batch.coins[0].rank, Some(1));

        let url = client.recorded_requests()[0].full_url();
        assert!(url.starts_with("https://cg.test/api/v3/coins/markets?vs_currency=usd"));
        assert!(url.contains("order=market_cap_desc"));
        assert!(url.contains("per_page=20"));
        assert!(url.contains("price_change_percentage=24h%2C7d"));
    }

    #[tokio::test]
    async fn maps_upstream_statuses_to_error_kinds() {
        let cases = [
            (429, SourceErrorKind::RateLimited),
            (503, SourceErrorKind::Unavailable),
            (404, SourceErrorKind::InvalidRequest),
        ];

        for (status, kind) in cases {
            let client = Arc::new(RecordingHttpClient::responding(Ok(
                HttpResponse::with_status(status, "{}"),
            )));
            let adapter = adapter_for(client);
            let request = SampleRequest::new(bitcoin(), 1, "usd").expect("valid request");

            let error = adapter.samples(request).await.expect_err("call should fail");
            assert_eq!(error.kind(), kind, "status {status}");
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_internal_error() {
        let client = Arc::new(RecordingHttpClient::responding(Ok(HttpResponse::ok_json(
            "<html>maintenance</html>",
        ))));
        let adapter = adapter_for(client);
        let request = SampleRequest::new(bitcoin(), 1, "usd").expect("valid request");

        let error = adapter.samples(request).await.expect_err("call should fail");
        assert_eq!(error.code(), "source.internal");
    }

    #[tokio::test]
    async fn retries_retryable_failures_up_to_budget() {
        let client = Arc::new(RecordingHttpClient::responding(Err(HttpError::new(
            "connection reset",
        ))));
        let mut policy = no_retry_policy();
        policy.backoff.max_retries = 2;
        let adapter = CoinGeckoAdapter::with_http_client(client.clone(), HttpAuth::None)
            .with_rate_policy(&policy)
            .with_circuit_breaker(Arc::new(CircuitBreaker::new(
                "test",
                crate::circuit_breaker::CircuitBreakerConfig {
                    trip_after: 10,
                    cool_down: std::time::Duration::from_secs(60),
                },
            )));
        let request = SampleRequest::new(bitcoin(), 1, "usd").expect("valid request");

        let error = adapter.samples(request).await.expect_err("call should fail");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert_eq!(client.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn circuit_breaker_opens_after_repeated_transport_failures() {
        let client = Arc::new(RecordingHttpClient::responding(Err(HttpError::new(
            "upstream timeout",
        ))));
        let adapter = adapter_for(Arc::clone(&client));
        let request = SampleRequest::new(bitcoin(), 1, "usd").expect("valid request");

        for _ in 0..3 {
            let error = adapter
                .samples(request.clone())
                .await
                .expect_err("call should fail");
            assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        }

        let error = adapter.samples(request).await.expect_err("circuit is open");
        assert!(error.message().contains("circuit breaker is open"));
        assert_eq!(client.recorded_requests().len(), 3);

        let health = adapter.health().await;
        assert_eq!(health.state, HealthState::Unhealthy);
        assert!(!health.rate_available);
    }

    #[tokio::test]
    async fn exhausted_budget_is_rate_limited_without_calling_upstream() {
        let client = Arc::new(RecordingHttpClient::responding(Ok(HttpResponse::ok_json(
            r#"{"prices":[]}"#,
        ))));
        let mut policy = no_retry_policy();
        policy.calls = 1;
        let adapter = CoinGeckoAdapter::with_http_client(client.clone(), HttpAuth::None)
            .with_rate_policy(&policy);
        let request = SampleRequest::new(bitcoin(), 1, "usd").expect("valid request");

        adapter
            .samples(request.clone())
            .await
            .expect("first call fits the budget");
        let error = adapter.samples(request).await.expect_err("budget spent");

        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
        assert_eq!(client.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn mock_mode_serves_deterministic_samples_around_snapshot_price() {
        let adapter = CoinGeckoAdapter::default();
        let request = SampleRequest::new(bitcoin(), 7, "usd").expect("valid request");

        let first = adapter.samples(request.clone()).await.expect("mock samples");
        let second = adapter.samples(request).await.expect("mock samples");

        assert_eq!(first.samples.len(), 7 * 24);
        let prices: Vec<f64> = first.samples.iter().map(|sample| sample.price).collect();
        let again: Vec<f64> = second.samples.iter().map(|sample| sample.price).collect();
        assert_eq!(prices, again);
        assert!(prices
            .iter()
            .all(|price| (price / 81_237.0 - 1.0).abs() <= 0.011));
    }

    #[tokio::test]
    async fn mock_mode_markets_respect_page_size() {
        let adapter = CoinGeckoAdapter::default();
        let request = MarketsRequest::new("usd", 3).expect("valid request");

        let batch = adapter.markets(request).await.expect("mock markets");
        assert_eq!(batch.coins.len(), 3);
    }

    #[test]
    fn granularity_follows_lookback() {
        assert_eq!(chart_granularity(1), Duration::minutes(5));
        assert_eq!(chart_granularity(30), Duration::hours(1));
        assert_eq!(chart_granularity(365), Duration::days(1));
    }
}
