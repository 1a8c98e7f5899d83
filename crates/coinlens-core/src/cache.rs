//! In-memory caching for source responses.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::data_source::{
    HealthStatus, MarketBatch, MarketsRequest, SampleBatch, SampleRequest, SampleSource,
    SourceError,
};
use crate::ProviderId;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL map shared behind an async lock.
#[derive(Debug)]
struct TtlMap<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    async fn put(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }

        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Caching decorator over any [`SampleSource`].
///
/// Successful, non-empty responses are kept for `ttl`; errors and empty
/// batches always go back to the inner source. A zero TTL disables caching.
#[derive(Debug, Clone)]
pub struct CachedSampleSource<S> {
    inner: Arc<S>,
    samples: Arc<TtlMap<SampleRequest, SampleBatch>>,
    markets: Arc<TtlMap<MarketsRequest, MarketBatch>>,
}

impl<S: SampleSource> CachedSampleSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            samples: Arc::new(TtlMap::new(ttl)),
            markets: Arc::new(TtlMap::new(ttl)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn is_disabled(&self) -> bool {
        self.samples.ttl.is_zero()
    }

    /// Number of stored sample entries, expired ones included.
    pub async fn cached_samples(&self) -> usize {
        self.samples.len().await
    }

    pub async fn clear(&self) {
        self.samples.clear().await;
        self.markets.clear().await;
    }
}

impl<S: SampleSource> SampleSource for CachedSampleSource<S> {
    fn id(&self) -> ProviderId {
        self.inner.id()
    }

    fn samples<'a>(
        &'a self,
        req: SampleRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SampleBatch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(batch) = self.samples.get(&req).await {
                debug!(coin = %req.coin, days = req.lookback_days, "sample cache hit");
                return Ok(batch);
            }

            let batch = self.inner.samples(req.clone()).await?;
            if !batch.samples.is_empty() {
                self.samples.put(req, batch.clone()).await;
            }
            Ok(batch)
        })
    }

    fn markets<'a>(
        &'a self,
        req: MarketsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<MarketBatch, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(batch) = self.markets.get(&req).await {
                debug!("markets cache hit");
                return Ok(batch);
            }

            let batch = self.inner.markets(req.clone()).await?;
            if !batch.coins.is_empty() {
                self.markets.put(req, batch.clone()).await;
            }
            Ok(batch)
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        self.inner.health()
    }
}
