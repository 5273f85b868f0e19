//! Substitute price series used when the provider cannot be reached.

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::statistics::round_to;
use crate::shared::types::{PricePoint, PriceSeries, Window};

/// Most points a synthetic history will contain.
pub const MAX_SYNTHETIC_POINTS: u32 = 7;
/// Gap between consecutive synthetic points.
pub const SYNTHETIC_SPACING_MINUTES: i64 = 5;
/// Maximum relative deviation of a point from the symbol's base price.
pub const SYNTHETIC_FLUCTUATION: f64 = 0.02;

const MIN_BASE_PRICE: u32 = 150;
const BASE_PRICE_SPREAD: u32 = 850;

enum Entropy {
    Os,
    /// Each generated series advances the seed so repeated calls differ
    /// while staying reproducible.
    Seeded(AtomicU64),
}

/// Produces plausible price series for a symbol.
///
/// The price level is a pure function of the symbol; the per-point noise
/// is random.
pub struct SyntheticSeriesGenerator {
    entropy: Entropy,
}

impl SyntheticSeriesGenerator {
    pub fn new() -> Self {
        Self { entropy: Entropy::Os }
    }

    /// Generator with reproducible output, for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            entropy: Entropy::Seeded(AtomicU64::new(seed)),
        }
    }

    /// Price level every synthetic series for `symbol` is centred on.
    pub fn base_price(symbol: &str) -> f64 {
        let code_sum: u32 = symbol.chars().map(|c| c as u32).fold(0, u32::wrapping_add);
        (MIN_BASE_PRICE + code_sum % BASE_PRICE_SPREAD) as f64
    }

    /// Number of points generated for a window; never zero.
    pub fn point_count(window: Window) -> usize {
        if window.is_latest() {
            1
        } else {
            window.as_minutes().min(MAX_SYNTHETIC_POINTS) as usize
        }
    }

    /// Build a series ending now, most recent point first.
    pub fn generate(&self, symbol: &str, window: Window) -> PriceSeries {
        let mut rng = self.rng();
        let base = Self::base_price(symbol);
        let now = Utc::now();

        let points = (0..Self::point_count(window))
            .map(|i| {
                let noise = rng.gen_range(-SYNTHETIC_FLUCTUATION..=SYNTHETIC_FLUCTUATION);
                let observed_at = now - Duration::minutes(i as i64 * SYNTHETIC_SPACING_MINUTES);
                PricePoint::new(round_to(base * (1.0 + noise), 2), observed_at)
            })
            .collect();

        PriceSeries::new(symbol, points)
    }

    fn rng(&self) -> StdRng {
        match &self.entropy {
            Entropy::Os => StdRng::from_entropy(),
            Entropy::Seeded(seed) => StdRng::seed_from_u64(seed.fetch_add(1, Ordering::Relaxed)),
        }
    }
}

impl Default for SyntheticSeriesGenerator {
    fn default() -> Self {
        Self::new()
    }
}
