//! Shared components - common types and errors

pub mod errors;
pub mod types;

pub use errors::{AggregationError, ApiError, UpstreamError};
pub use types::{FetchedSeries, PricePoint, PriceSeries, Provenance, Window};
