//! Core contracts for coinlens.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The candle aggregation engine and its synthetic fallback
//! - Sample source traits, the CoinGecko adapter and response caching
//! - Request orchestration with graceful degradation
//! - Portfolio simulation priced against the market overview
//! - Response envelope and structured errors

pub mod adapters;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod portfolio;
pub mod selection;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod throttling;

pub use adapters::CoinGeckoAdapter;
pub use cache::CachedSampleSource;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::SourceConfig;
pub use data_source::{
    HealthState, HealthStatus, MarketBatch, MarketsRequest, SampleBatch, SampleRequest,
    SampleSource, SourceError, SourceErrorKind,
};
pub use domain::{
    Cadence, Candle, CandleSeries, ChartStyle, CoinId, MarketCoin, MarketStats, Sample, Timeframe,
    TimeframePolicy, UtcDateTime,
};
pub use engine::{aggregate, bound, build_candles, synthetic_series, BuildReport};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::ValidationError;
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};
pub use portfolio::{Holding, HoldingValue, Investment, Portfolio, PortfolioValuation};
pub use selection::ChartSelection;
pub use service::{CandleResponse, CandleService, MarketResponse, PortfolioResponse};
pub use snapshot::market_snapshot;
pub use source::ProviderId;
pub use throttling::{Backoff, RatePolicy, Throttle};
