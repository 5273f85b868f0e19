//! Client for the stock exchange evaluation service.
//!
//! The provider exposes an auth endpoint issuing bearer tokens and a data
//! endpoint returning either the current price or a price history. Both are
//! reached through traits so the session and fetch layers can be exercised
//! without a network.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::shared::errors::UpstreamError;
use crate::shared::types::{PricePoint, PriceSeries, Window};

pub const DEFAULT_BASE_URL: &str = "http://20.244.56.144/evaluation-service";

/// Credential payload posted to the auth endpoint.
///
/// Deserialized from config with snake_case keys, serialized for the
/// provider with its camelCase names.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCredentials {
    pub email: String,
    pub name: String,
    #[serde(rename(serialize = "rollNo"))]
    pub roll_no: String,
    #[serde(rename(serialize = "accessCode"))]
    pub access_code: String,
    #[serde(rename(serialize = "clientID"))]
    pub client_id: String,
    #[serde(rename(serialize = "clientSecret"))]
    pub client_secret: String,
}

impl Default for ProviderCredentials {
    fn default() -> Self {
        Self {
            email: "your-email@example.com".to_string(),
            name: "Your Name".to_string(),
            roll_no: "your-roll-no".to_string(),
            access_code: "your-access-code".to_string(),
            client_id: "your-client-id".to_string(),
            client_secret: "your-client-secret".to_string(),
        }
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("roll_no", &self.roll_no)
            .field("access_code", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Token issued by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// One-time registration request, answered with the client id and secret.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub mobile_no: String,
    pub github_username: String,
    pub roll_no: String,
    pub college_name: String,
    pub access_code: String,
}

/// The shapes the data endpoint answers with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PricePayload {
    /// `{ "stock": { price, lastUpdatedAt } }` when no window was given.
    Current { stock: PricePoint },
    /// `[ { price, lastUpdatedAt }, ... ]` for a windowed request.
    History(Vec<PricePoint>),
    /// A bare point.
    Point(PricePoint),
}

impl PricePayload {
    /// Normalize into a non-empty series with finite prices.
    pub fn into_series(self, symbol: &str) -> Result<PriceSeries, UpstreamError> {
        let points = match self {
            PricePayload::Current { stock } => vec![stock],
            PricePayload::History(points) => points,
            PricePayload::Point(point) => vec![point],
        };

        if points.is_empty() {
            return Err(UpstreamError::Malformed(format!("empty price history for {symbol}")));
        }
        if let Some(bad) = points.iter().find(|p| !p.price.is_finite()) {
            return Err(UpstreamError::Malformed(format!(
                "non-finite price {} for {symbol}",
                bad.price
            )));
        }

        Ok(PriceSeries::new(symbol, points))
    }
}

/// Auth endpoint collaborator.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn authenticate(&self, credentials: &ProviderCredentials) -> Result<AuthGrant, UpstreamError>;
}

/// Data endpoint collaborator.
#[async_trait]
pub trait PriceApi: Send + Sync {
    /// Prices for `symbol`; a latest-only window sends no `minutes` filter.
    async fn stock_prices(&self, symbol: &str, window: Window, token: &str) -> Result<PricePayload, UpstreamError>;
}

/// reqwest-backed provider client.
pub struct StockExchangeClient {
    http_client: Client,
    base_url: Url,
}

impl StockExchangeClient {
    /// `timeout` bounds every request made by this client.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url).map_err(|e| UpstreamError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidUrl(base_url.to_string()));
        }

        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Register with the provider and return the issued credentials verbatim.
    pub async fn register(&self, registration: &Registration) -> Result<serde_json::Value, UpstreamError> {
        let url = self.endpoint(&["register"])?;
        let response = self.http_client.post(url).json(registration).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))
    }

    /// Append path segments to the base url, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl AuthApi for StockExchangeClient {
    async fn authenticate(&self, credentials: &ProviderCredentials) -> Result<AuthGrant, UpstreamError> {
        let url = self.endpoint(&["auth"])?;
        debug!("Requesting auth token from {}", url);

        let response = self.http_client.post(url).json(credentials).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let grant: AuthGrant = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        if grant.access_token.is_empty() {
            return Err(UpstreamError::Malformed("empty access_token".to_string()));
        }
        Ok(grant)
    }
}

#[async_trait]
impl PriceApi for StockExchangeClient {
    async fn stock_prices(&self, symbol: &str, window: Window, token: &str) -> Result<PricePayload, UpstreamError> {
        let mut url = self.endpoint(&["stocks", symbol])?;
        if !window.is_latest() {
            url.query_pairs_mut().append_pair("minutes", &window.to_string());
        }
        debug!("Requesting data from {}", url);

        let response = self.http_client.get(url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))
    }
}
