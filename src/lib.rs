//! Stockscope - stock price aggregation and correlation service
//!
//! Fetches price histories from the stock exchange provider, caches them
//! briefly, and derives per-symbol averages and pairwise Pearson
//! correlation. Provider outages degrade to synthetic data instead of
//! failing requests.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use config::ServiceConfig;
pub use domain::aggregation::{AggregateResult, AggregationService, CorrelationResult};
pub use infrastructure::fetcher::SeriesFetcher;
pub use infrastructure::session::SessionManager;
pub use shared::types::{FetchedSeries, PricePoint, PriceSeries, Provenance, Window};
