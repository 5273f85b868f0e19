//! Domain layer - statistics, synthetic data and the analytics use cases

pub mod aggregation;
pub mod statistics;
pub mod synthetic;

pub use aggregation::{AggregateResult, AggregationService, CorrelationResult};
pub use synthetic::SyntheticSeriesGenerator;
