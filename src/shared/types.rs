//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single price observation for a symbol.
///
/// Serialized with the provider's field names so the presentation layer can
/// consume live and cached points without remapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    #[serde(rename = "lastUpdatedAt")]
    pub observed_at: DateTime<Utc>,
}

impl PricePoint {
    pub fn new(price: f64, observed_at: DateTime<Utc>) -> Self {
        Self { price, observed_at }
    }
}

/// Price observations for one symbol.
///
/// Points keep the order they were produced in (the provider sends most
/// recent first). Nothing in this crate re-sorts them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Look-back window in minutes. Zero means "latest price only".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Window(u32);

impl Window {
    pub const LATEST: Window = Window(0);

    pub fn minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub fn as_minutes(&self) -> u32 {
        self.0
    }

    pub fn is_latest(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a series handed out by the fetcher came from.
///
/// Never exposed through the HTTP responses; used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Fetched from the provider during this call.
    Live,
    /// Provider data served from the cache.
    Cached,
    /// Generated locally because the provider failed.
    Synthetic,
}

impl Provenance {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Provenance::Synthetic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedSeries {
    pub series: PriceSeries,
    pub provenance: Provenance,
}

impl FetchedSeries {
    pub fn live(series: PriceSeries) -> Self {
        Self { series, provenance: Provenance::Live }
    }

    pub fn cached(series: PriceSeries) -> Self {
        Self { series, provenance: Provenance::Cached }
    }

    pub fn synthetic(series: PriceSeries) -> Self {
        Self { series, provenance: Provenance::Synthetic }
    }
}
