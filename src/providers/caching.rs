use crate::core::cache::KeyValueCollection;
use crate::core::currency::CurrencyRateProvider;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Caches exchange rates for a bounded age.
///
/// A rate younger than `max_age` is returned without calling the inner
/// provider. When the inner provider fails, an older rate is only returned if
/// `allow_stale` is set.
pub struct CachingCurrencyRateProvider<T: CurrencyRateProvider> {
    inner: T,
    rates: Arc<dyn KeyValueCollection>,
    max_age: Duration,
    allow_stale: bool,
}

impl<T: CurrencyRateProvider> CachingCurrencyRateProvider<T> {
    pub fn new(
        inner: T,
        rates: Arc<dyn KeyValueCollection>,
        max_age: Duration,
        allow_stale: bool,
    ) -> Self {
        Self {
            inner,
            rates,
            max_age,
            allow_stale,
        }
    }
}

#[async_trait]
impl<T: CurrencyRateProvider + Send + Sync> CurrencyRateProvider for CachingCurrencyRateProvider<T> {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let key = format!("{}-{}", from.to_uppercase(), to.to_uppercase());
        let cached = self.rates.get(&key).await.and_then(|entry| {
            entry
                .value
                .parse::<f64>()
                .ok()
                .map(|rate| (rate, Utc::now() - entry.created_at))
        });

        if let Some((rate, age)) = cached {
            if age <= self.max_age && self.max_age > Duration::zero() {
                debug!("Cache hit for currency rate: {}", key);
                return Ok(rate);
            }
        }
        debug!("Cache miss for currency rate: {}", key);

        match self.inner.get_rate(from, to).await {
            Ok(rate) => {
                self.rates.put(&key, rate.to_string()).await;
                Ok(rate)
            }
            Err(e) => match cached {
                Some((rate, age)) if self.allow_stale => {
                    warn!(
                        "Using cached {} rate from {} minutes ago: {}",
                        key,
                        age.num_minutes(),
                        e
                    );
                    Ok(rate)
                }
                _ => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockRateProvider {
        call_count: AtomicUsize,
        failing: AtomicBool,
    }

    impl MockRateProvider {
        fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for &MockRateProvider {
        async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(anyhow!("rate feed down"))
            } else {
                Ok(7.1)
            }
        }
    }

    fn caching(
        inner: &MockRateProvider,
        max_age: Duration,
        allow_stale: bool,
    ) -> (
        CachingCurrencyRateProvider<&MockRateProvider>,
        Arc<MemoryCollection>,
    ) {
        let rates = Arc::new(MemoryCollection::new());
        let provider = CachingCurrencyRateProvider::new(
            inner,
            Arc::clone(&rates) as Arc<dyn KeyValueCollection>,
            max_age,
            allow_stale,
        );
        (provider, rates)
    }

    #[tokio::test]
    async fn test_fresh_rate_is_served_from_cache() {
        let inner = MockRateProvider::new();
        let (provider, _) = caching(&inner, Duration::minutes(5), false);

        assert_eq!(provider.get_rate("USD", "CNY").await.unwrap(), 7.1);
        assert_eq!(provider.get_rate("usd", "cny").await.unwrap(), 7.1);
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_max_age_always_fetches() {
        let inner = MockRateProvider::new();
        let (provider, _) = caching(&inner, Duration::zero(), false);

        provider.get_rate("USD", "CNY").await.unwrap();
        provider.get_rate("USD", "CNY").await.unwrap();
        assert_eq!(inner.call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_rate_is_not_used_without_consent() {
        let inner = MockRateProvider::new();
        let (provider, rates) = caching(&inner, Duration::minutes(5), false);
        rates.put("USD-CNY", "6.9".to_string()).await;
        inner.failing.store(true, Ordering::SeqCst);

        // Fresh entry is still served even though the feed is down.
        assert_eq!(provider.get_rate("USD", "CNY").await.unwrap(), 6.9);

        let (provider, rates) = caching(&inner, Duration::zero(), false);
        rates.put("USD-CNY", "6.9".to_string()).await;
        let err = provider.get_rate("USD", "CNY").await.unwrap_err();
        assert_eq!(err.to_string(), "rate feed down");
    }

    #[tokio::test]
    async fn test_stale_rate_fallback_when_allowed() {
        let inner = MockRateProvider::new();
        inner.failing.store(true, Ordering::SeqCst);

        let (provider, rates) = caching(&inner, Duration::zero(), true);
        assert!(provider.get_rate("USD", "CNY").await.is_err());

        rates.put("USD-CNY", "6.9".to_string()).await;
        assert_eq!(provider.get_rate("USD", "CNY").await.unwrap(), 6.9);
    }
}
