//! Environment-driven source configuration.
//!
//! | Variable | Fallback | Default |
//! |----------|----------|---------|
//! | `COINLENS_COINGECKO_API_KEY` | `COINGECKO_API_KEY` | none |
//! | `COINLENS_COINGECKO_API_URL` | `COINGECKO_API_URL` | `https://api.coingecko.com/api/v3` |
//! | `COINLENS_CACHE_TTL_SECS` | | `60` |
//! | `COINLENS_REQUEST_TIMEOUT_MS` | | `3000` |
//! | `COINLENS_OFFLINE` | | `false` |

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::adapters::{CoinGeckoAdapter, DEFAULT_BASE_URL};
use crate::cache::CachedSampleSource;
use crate::http_client::{HttpAuth, HttpClient, NoopHttpClient, ReqwestHttpClient};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;

/// Settings for assembling the market data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    api_key: Option<String>,
    base_url: String,
    cache_ttl: Duration,
    request_timeout: Duration,
    offline: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: String::from(DEFAULT_BASE_URL),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            offline: false,
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every setting from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`, so callers can supply a fixed map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = non_empty("COINLENS_COINGECKO_API_KEY")
            .or_else(|| non_empty("COINGECKO_API_KEY"));
        let base_url = non_empty("COINLENS_COINGECKO_API_URL")
            .or_else(|| non_empty("COINGECKO_API_URL"))
            .unwrap_or(defaults.base_url);
        let cache_ttl = parse_u64(
            "COINLENS_CACHE_TTL_SECS",
            non_empty("COINLENS_CACHE_TTL_SECS"),
        )
        .map_or(defaults.cache_ttl, Duration::from_secs);
        let request_timeout = parse_u64(
            "COINLENS_REQUEST_TIMEOUT_MS",
            non_empty("COINLENS_REQUEST_TIMEOUT_MS"),
        )
        .map_or(defaults.request_timeout, Duration::from_millis);
        let offline = non_empty("COINLENS_OFFLINE").is_some_and(|value| parse_flag(&value));

        Self {
            api_key,
            base_url,
            cache_ttl,
            request_timeout,
            offline,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Offline mode serves deterministic data without network access.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Total budget for one source call, retries and backoff included.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Timeout for a single HTTP attempt: half the total budget, so a hung
    /// first attempt still leaves room for a retry.
    pub fn attempt_timeout(&self) -> Duration {
        self.request_timeout / 2
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Assembles the CoinGecko adapter behind the response cache.
    pub fn build_source(&self) -> CachedSampleSource<CoinGeckoAdapter> {
        let http_client: Arc<dyn HttpClient> = if self.offline {
            Arc::new(NoopHttpClient)
        } else {
            Arc::new(ReqwestHttpClient::new())
        };

        let adapter = CoinGeckoAdapter::with_http_client(http_client, HttpAuth::None)
            .with_api_key(self.api_key.as_deref())
            .with_base_url(self.base_url.as_str())
            .with_request_timeout(self.attempt_timeout());

        CachedSampleSource::new(adapter, self.cache_ttl)
    }
}

fn parse_u64(name: &str, value: Option<String>) -> Option<u64> {
    let value = value?;
    match value.trim().parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(variable = name, %value, "ignoring non-numeric setting, using default");
            None
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
