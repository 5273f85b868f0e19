//! Infrastructure layer - provider access, session, caching and fetching

pub mod cache;
pub mod fetcher;
pub mod session;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheKey, InMemorySeriesCache, SeriesCache};
pub use fetcher::{FetchPolicy, SeriesFetcher};
pub use session::SessionManager;
pub use upstream::{AuthApi, PriceApi, ProviderCredentials, StockExchangeClient};
