//! Call-counting fakes of the provider traits.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::upstream::{AuthApi, AuthGrant, PriceApi, PricePayload, ProviderCredentials};
use crate::shared::errors::UpstreamError;
use crate::shared::types::{PricePoint, Window};

pub struct FakeAuth {
    calls: AtomicUsize,
    expires_in: Option<u64>,
    fail: bool,
    delay: Duration,
}

impl FakeAuth {
    pub fn granting(expires_in: Option<u64>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            expires_in,
            fail: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::granting(None)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthApi for FakeAuth {
    async fn authenticate(&self, _credentials: &ProviderCredentials) -> Result<AuthGrant, UpstreamError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(UpstreamError::Status(reqwest::StatusCode::UNAUTHORIZED));
        }
        Ok(AuthGrant {
            access_token: format!("token-{n}"),
            expires_in: self.expires_in,
        })
    }
}

enum Behaviour {
    Prices(HashMap<String, Vec<f64>>),
    Fail,
    Hang,
}

pub struct FakePrices {
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    behaviour: Behaviour,
}

impl FakePrices {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            behaviour,
        }
    }

    /// Same prices for every symbol.
    pub fn fixed(prices: &[f64]) -> Self {
        let mut map = HashMap::new();
        map.insert("*".to_string(), prices.to_vec());
        Self::with(Behaviour::Prices(map))
    }

    pub fn per_symbol(entries: &[(&str, &[f64])]) -> Self {
        let map = entries
            .iter()
            .map(|(symbol, prices)| (symbol.to_string(), prices.to_vec()))
            .collect();
        Self::with(Behaviour::Prices(map))
    }

    pub fn failing() -> Self {
        Self::with(Behaviour::Fail)
    }

    pub fn hanging() -> Self {
        Self::with(Behaviour::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceApi for FakePrices {
    async fn stock_prices(&self, symbol: &str, window: Window, token: &str) -> Result<PricePayload, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());

        let map = match &self.behaviour {
            Behaviour::Prices(map) => map,
            Behaviour::Fail => return Err(UpstreamError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                return Err(UpstreamError::Malformed("hung request completed".to_string()));
            }
        };

        let prices = map
            .get(symbol)
            .or_else(|| map.get("*"))
            .ok_or_else(|| UpstreamError::Status(reqwest::StatusCode::NOT_FOUND))?;
        let now = Utc::now();
        let points: Vec<PricePoint> = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint::new(price, now - ChronoDuration::minutes(i as i64)))
            .collect();

        if window.is_latest() && points.len() == 1 {
            return Ok(PricePayload::Current { stock: points[0] });
        }
        Ok(PricePayload::History(points))
    }
}
