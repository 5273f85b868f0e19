//! Price series acquisition: cache first, then the provider, then a
//! synthetic substitute.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::cache::{CacheKey, SeriesCache, DEFAULT_CACHE_TTL};
use super::session::SessionManager;
use super::upstream::PriceApi;
use crate::domain::synthetic::SyntheticSeriesGenerator;
use crate::shared::errors::UpstreamError;
use crate::shared::types::{FetchedSeries, PriceSeries, Window};

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    /// How long a live series is served from the cache.
    pub cache_ttl: Duration,
    /// Upper bound on token acquisition plus the data request.
    pub upstream_timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

pub struct SeriesFetcher {
    session: Arc<SessionManager>,
    cache: Arc<dyn SeriesCache>,
    prices: Arc<dyn PriceApi>,
    synthetic: SyntheticSeriesGenerator,
    policy: FetchPolicy,
}

impl SeriesFetcher {
    pub fn new(
        session: Arc<SessionManager>,
        cache: Arc<dyn SeriesCache>,
        prices: Arc<dyn PriceApi>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            session,
            cache,
            prices,
            synthetic: SyntheticSeriesGenerator::new(),
            policy,
        }
    }

    pub fn with_synthetic(mut self, synthetic: SyntheticSeriesGenerator) -> Self {
        self.synthetic = synthetic;
        self
    }

    /// Series for `symbol` over `window`. Never fails and never returns an
    /// empty series.
    ///
    /// Live results are cached for the policy TTL. Synthetic results are not
    /// cached, so the next call tries the provider again.
    pub async fn fetch(&self, symbol: &str, window: Window) -> FetchedSeries {
        let key = CacheKey::new(symbol, window);
        if let Some(series) = self.cache.get(&key).await {
            debug!("Using cached data for {}", key);
            return FetchedSeries::cached(series);
        }

        let timeout = self.policy.upstream_timeout;
        let result = tokio::time::timeout(timeout, self.fetch_live(symbol, window))
            .await
            .unwrap_or(Err(UpstreamError::Timeout(timeout)));

        match result {
            Ok(series) => {
                self.cache.put(key, series.clone(), self.policy.cache_ttl).await;
                FetchedSeries::live(series)
            }
            Err(e) => {
                warn!(symbol, window = window.as_minutes(), error = %e, "Provider fetch failed, serving synthetic series");
                FetchedSeries::synthetic(self.synthetic.generate(symbol, window))
            }
        }
    }

    async fn fetch_live(&self, symbol: &str, window: Window) -> Result<PriceSeries, UpstreamError> {
        let token = self.session.token().await;
        let payload = self.prices.stock_prices(symbol, window, &token).await?;
        payload.into_series(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::InMemorySeriesCache;
    use crate::infrastructure::testing::{FakeAuth, FakePrices};
    use crate::infrastructure::upstream::ProviderCredentials;
    use crate::shared::types::Provenance;

    struct Harness {
        auth: Arc<FakeAuth>,
        prices: Arc<FakePrices>,
        cache: Arc<InMemorySeriesCache>,
        fetcher: SeriesFetcher,
    }

    fn harness(auth: FakeAuth, prices: FakePrices) -> Harness {
        let auth = Arc::new(auth);
        let prices = Arc::new(prices);
        let cache = Arc::new(InMemorySeriesCache::new());
        let session = Arc::new(SessionManager::new(
            auth.clone(),
            ProviderCredentials::default(),
            DEFAULT_UPSTREAM_TIMEOUT,
        ));
        let fetcher = SeriesFetcher::new(session, cache.clone(), prices.clone(), FetchPolicy::default())
            .with_synthetic(SyntheticSeriesGenerator::seeded(11));
        Harness { auth, prices, cache, fetcher }
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_fetch_is_cached() {
        let h = harness(FakeAuth::granting(Some(3600)), FakePrices::fixed(&[10.0, 20.0, 30.0]));

        let first = h.fetcher.fetch("AAPL", Window::minutes(30)).await;
        assert_eq!(first.provenance, Provenance::Live);
        assert_eq!(first.series.len(), 3);

        tokio::time::advance(Duration::from_secs(30)).await;
        let second = h.fetcher.fetch("AAPL", Window::minutes(30)).await;
        assert_eq!(second.provenance, Provenance::Cached);
        assert_eq!(second.series, first.series);
        assert_eq!(h.prices.calls(), 1);
        assert_eq!(h.prices.tokens(), vec!["token-1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_triggers_one_upstream_call() {
        let h = harness(FakeAuth::granting(Some(3600)), FakePrices::fixed(&[10.0, 20.0]));

        h.fetcher.fetch("AAPL", Window::minutes(30)).await;
        tokio::time::advance(DEFAULT_CACHE_TTL).await;

        let refreshed = h.fetcher.fetch("AAPL", Window::minutes(30)).await;
        assert_eq!(refreshed.provenance, Provenance::Live);
        assert_eq!(h.prices.calls(), 2);
        assert_eq!(h.auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_windows_are_cached_separately() {
        let h = harness(FakeAuth::granting(Some(3600)), FakePrices::fixed(&[42.0]));

        let latest = h.fetcher.fetch("AAPL", Window::LATEST).await;
        h.fetcher.fetch("AAPL", Window::minutes(10)).await;

        assert_eq!(latest.series.len(), 1);
        assert_eq!(h.prices.calls(), 2);
        assert_eq!(h.cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_failure_serves_uncached_synthetic_series() {
        let h = harness(FakeAuth::granting(Some(3600)), FakePrices::failing());

        let first = h.fetcher.fetch("MSFT", Window::minutes(30)).await;
        assert_eq!(first.provenance, Provenance::Synthetic);
        assert_eq!(first.series.symbol, "MSFT");
        assert!(!first.series.is_empty());
        assert!(h.cache.is_empty().await);

        let second = h.fetcher.fetch("MSFT", Window::minutes(30)).await;
        assert_eq!(second.provenance, Provenance::Synthetic);
        assert_eq!(h.prices.calls(), 2);
    }

    #[tokio::test]
    async fn test_auth_outage_still_attempts_fetch_with_fallback_token() {
        let h = harness(FakeAuth::failing(), FakePrices::failing());

        let fetched = h.fetcher.fetch("MSFT", Window::LATEST).await;
        assert_eq!(fetched.provenance, Provenance::Synthetic);
        assert_eq!(fetched.series.len(), 1);
        assert_eq!(h.prices.tokens(), vec![crate::infrastructure::session::FALLBACK_TOKEN.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_provider_times_out_to_synthetic() {
        let h = harness(FakeAuth::granting(Some(3600)), FakePrices::hanging());

        let fetched = h.fetcher.fetch("GOOG", Window::minutes(5)).await;
        assert_eq!(fetched.provenance, Provenance::Synthetic);
        assert_eq!(fetched.series.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_history_falls_back() {
        let h = harness(FakeAuth::granting(Some(3600)), FakePrices::fixed(&[]));

        let fetched = h.fetcher.fetch("AAPL", Window::minutes(30)).await;
        assert_eq!(fetched.provenance, Provenance::Synthetic);
        assert!(h.cache.is_empty().await);
    }
}
