//! Sample source trait and request/response types.
//!
//! A [`SampleSource`] is the upstream collaborator of the candle engine: it
//! supplies raw price/volume samples for one coin over a lookback window, and
//! the market overview rows. Implementations may fail or return nothing; the
//! [`CandleService`](crate::CandleService) turns either case into a degraded
//! synthetic result.
//!
//! | Endpoint | Request | Response |
//! |----------|---------|----------|
//! | Samples | [`SampleRequest`] | [`SampleBatch`] |
//! | Markets | [`MarketsRequest`] | [`MarketBatch`] |

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CoinId, MarketCoin, ProviderId, Sample, Timeframe, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    /// Probing after an outage; calls go out but may fail.
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    /// False while the source refuses calls outright.
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }
}

/// Why a source could not deliver. Every kind leads to the synthetic
/// fallback; the kind decides retries and the warning code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport failure, upstream 5xx or open circuit.
    Unavailable,
    /// Upstream 429 or the client-side budget is spent.
    RateLimited,
    /// Answered, but with nothing chartable.
    Empty,
    Timeout,
    /// Upstream 4xx other than 429, or a request rejected before sending.
    InvalidRequest,
    /// Unparseable payload or other local failure.
    Internal,
}

impl SourceErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unavailable => "source.unavailable",
            Self::RateLimited => "source.rate_limited",
            Self::Empty => "source.empty",
            Self::Timeout => "source.timeout",
            Self::InvalidRequest => "source.invalid_request",
            Self::Internal => "source.internal",
        }
    }

    /// Whether asking again later may succeed.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Unavailable | Self::RateLimited | Self::Timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", .kind.code())]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Empty, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.kind.is_transient()
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::invalid_request(error.to_string())
    }
}

/// Request payload for the samples endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SampleRequest {
    pub coin: CoinId,
    pub lookback_days: u32,
    pub vs_currency: String,
}

impl SampleRequest {
    pub fn new(
        coin: CoinId,
        lookback_days: u32,
        vs_currency: impl AsRef<str>,
    ) -> Result<Self, SourceError> {
        if lookback_days == 0 {
            return Err(SourceError::invalid_request(
                "sample request lookback must be at least one day",
            ));
        }
        let vs_currency = validate_vs_currency(vs_currency.as_ref())?;

        Ok(Self {
            coin,
            lookback_days,
            vs_currency,
        })
    }

    /// Request covering the lookback window of `timeframe`, priced in USD.
    pub fn for_timeframe(coin: CoinId, timeframe: Timeframe) -> Self {
        Self {
            coin,
            lookback_days: timeframe.policy().lookback_days,
            vs_currency: String::from("usd"),
        }
    }
}

/// Request payload for the markets endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketsRequest {
    pub vs_currency: String,
    pub per_page: u32,
}

impl MarketsRequest {
    pub fn new(vs_currency: impl AsRef<str>, per_page: u32) -> Result<Self, SourceError> {
        if per_page == 0 {
            return Err(SourceError::invalid_request(
                "markets request per_page must be greater than zero",
            ));
        }
        let vs_currency = validate_vs_currency(vs_currency.as_ref())?;

        Ok(Self {
            vs_currency,
            per_page,
        })
    }
}

impl Default for MarketsRequest {
    fn default() -> Self {
        Self {
            vs_currency: String::from("usd"),
            per_page: 20,
        }
    }
}

/// Raw samples for one coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    pub coin: CoinId,
    pub samples: Vec<Sample>,
}

/// Market overview rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBatch {
    pub coins: Vec<MarketCoin>,
}

/// Upstream contract consumed by [`CandleService`](crate::CandleService).
///
/// Implementations must be `Send + Sync`; the service shares one source across
/// concurrent requests.
pub trait SampleSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetches samples for `req.coin` over `req.lookback_days`, in any order.
    fn samples<'a>(
        &'a self,
        req: SampleRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SampleBatch, SourceError>> + Send + 'a>>;

    /// Fetches the market overview, ordered by market cap.
    fn markets<'a>(
        &'a self,
        req: MarketsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketBatch, SourceError>> + Send + 'a>>;

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}

fn validate_vs_currency(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_lowercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }
    Ok(normalized)
}
