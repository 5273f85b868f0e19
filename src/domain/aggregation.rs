//! Single-symbol aggregates and pairwise correlation.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::statistics;
use crate::infrastructure::fetcher::SeriesFetcher;
use crate::shared::errors::AggregationError;
use crate::shared::types::{FetchedSeries, PriceSeries, Provenance, Window};

/// Mean and spread of one symbol's series.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub symbol: String,
    pub average_price: f64,
    pub std_dev: f64,
    pub series: PriceSeries,
    pub provenance: Provenance,
}

impl AggregateResult {
    fn from_fetched(symbol: &str, fetched: FetchedSeries) -> Result<Self, AggregationError> {
        let FetchedSeries { series, provenance } = fetched;
        if series.is_empty() {
            return Err(AggregationError::EmptySeries(symbol.to_string()));
        }

        Ok(Self {
            symbol: symbol.to_string(),
            average_price: statistics::mean(&series.points),
            std_dev: statistics::sample_std_dev(&series.points),
            series,
            provenance,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationResult {
    pub symbols: (String, String),
    /// In `[-1, 1]`, four decimals; `0.0` when undetermined.
    pub correlation: f64,
    /// Keyed by symbol; a symbol requested twice appears once.
    pub per_symbol: BTreeMap<String, AggregateResult>,
}

impl CorrelationResult {
    /// Whether either side was served from synthetic data.
    pub fn is_degraded(&self) -> bool {
        self.per_symbol.values().any(|a| a.provenance.is_degraded())
    }
}

pub struct AggregationService {
    fetcher: Arc<SeriesFetcher>,
}

impl AggregationService {
    pub fn new(fetcher: Arc<SeriesFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn aggregate(&self, symbol: &str, window: Window) -> Result<AggregateResult, AggregationError> {
        let fetched = self.fetcher.fetch(symbol, window).await;
        AggregateResult::from_fetched(symbol, fetched)
    }

    /// Correlate two symbols over the same window. Both series are fetched
    /// concurrently and independently.
    pub async fn correlate(
        &self,
        first: &str,
        second: &str,
        window: Window,
    ) -> Result<CorrelationResult, AggregationError> {
        let (fetched_first, fetched_second) =
            futures::join!(self.fetcher.fetch(first, window), self.fetcher.fetch(second, window));

        let first_result = AggregateResult::from_fetched(first, fetched_first)?;
        let second_result = AggregateResult::from_fetched(second, fetched_second)?;
        let correlation = statistics::pearson(&first_result.series.points, &second_result.series.points);

        info!(
            "Correlation {}/{} over {}m: {} ({} vs {} points)",
            first,
            second,
            window,
            correlation,
            first_result.series.len(),
            second_result.series.len()
        );

        let mut per_symbol = BTreeMap::new();
        per_symbol.insert(first.to_string(), first_result);
        per_symbol.insert(second.to_string(), second_result);

        Ok(CorrelationResult {
            symbols: (first.to_string(), second.to_string()),
            correlation,
            per_symbol,
        })
    }
}
