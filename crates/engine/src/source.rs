//! Candle sources, TTL cache and retry policy
//!
//! The analysis core never performs I/O; everything here sits in front of it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::types::Candle;

/// Anything that can supply an ascending candle series
#[async_trait]
pub trait PriceDataSource: Send + Sync {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, SourceError>;
}

#[async_trait]
impl<S: PriceDataSource + ?Sized> PriceDataSource for Arc<S> {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, SourceError> {
        (**self).fetch_candles(symbol, interval, limit).await
    }
}

// ============================================================================
// Retry policy
// ============================================================================

/// Exponential backoff with random jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random delay added to each backoff
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }

    /// Run `op` until it succeeds or `max_attempts` is reached; the last
    /// error is returned
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

// ============================================================================
// Candle cache
// ============================================================================

struct CacheEntry {
    candles: Vec<Candle>,
    stored_at: Instant,
}

/// In-memory candle cache keyed by (symbol, interval)
pub struct CandleCache {
    ttl: Duration,
    min_candles: usize,
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl CandleCache {
    /// Entries older than `ttl` or shorter than `min_candles` are never served
    pub fn new(ttl: Duration, min_candles: usize) -> Self {
        Self {
            ttl,
            min_candles,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The newest `limit` candles of a fresh entry. Misses when the entry
    /// holds fewer than `limit` candles.
    pub async fn get(&self, symbol: &str, interval: &str, limit: usize) -> Option<Vec<Candle>> {
        let entries = self.entries.read().await;
        let entry = entries.get(&(symbol.to_string(), interval.to_string()))?;
        let len = entry.candles.len();
        if entry.stored_at.elapsed() >= self.ttl || len < self.min_candles || len < limit {
            return None;
        }
        Some(entry.candles[len - limit..].to_vec())
    }

    pub async fn put(&self, symbol: &str, interval: &str, candles: Vec<Candle>) {
        self.entries.write().await.insert(
            (symbol.to_string(), interval.to_string()),
            CacheEntry {
                candles,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Cache first, then the wrapped source under the retry policy
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<CandleCache>,
    retry: RetryPolicy,
}

impl<S: PriceDataSource> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<CandleCache>, retry: RetryPolicy) -> Self {
        Self {
            inner,
            cache,
            retry,
        }
    }
}

#[async_trait]
impl<S: PriceDataSource> PriceDataSource for CachedSource<S> {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, SourceError> {
        if let Some(candles) = self.cache.get(symbol, interval, limit as usize).await {
            debug!(symbol, interval, count = candles.len(), "Candle cache hit");
            return Ok(candles);
        }

        let label = format!("{symbol} {interval}");
        let candles = self
            .retry
            .run(&label, move || self.inner.fetch_candles(symbol, interval, limit))
            .await?;

        self.cache.put(symbol, interval, candles.clone()).await;
        Ok(candles)
    }
}
