//! HTTP API consumed by the dashboard.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::aggregation::{AggregateResult, AggregationService};
use crate::shared::errors::ApiError;
use crate::shared::types::{PricePoint, Window};

/// Shared state handed to every handler.
pub struct AppState {
    pub aggregation: AggregationService,
}

impl AppState {
    pub fn new(aggregation: AggregationService) -> Arc<Self> {
        Arc::new(Self { aggregation })
    }
}

// ── Query params ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    minutes: Option<String>,
    aggregation: Option<String>,
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    average_stock_price: Option<f64>,
    price_history: Vec<PricePoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockSummary {
    average_price: f64,
    standard_deviation: f64,
    price_history: Vec<PricePoint>,
}

impl From<AggregateResult> for StockSummary {
    fn from(result: AggregateResult) -> Self {
        Self {
            average_price: result.average_price,
            standard_deviation: result.std_dev,
            price_history: result.series.points,
        }
    }
}

#[derive(Debug, Serialize)]
struct CorrelationResponse {
    correlation: f64,
    stocks: BTreeMap<String, StockSummary>,
}

// ── Route definitions ────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stocks/:symbol", get(stock))
        .route("/stockcorrelation", get(stock_correlation))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}

async fn stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<StockQuery>,
) -> Result<Json<StockResponse>, ApiError> {
    let window = match query.minutes.as_deref() {
        Some(raw) => parse_minutes(raw)?,
        None => Window::LATEST,
    };
    let with_average = query.aggregation.as_deref() == Some("average");
    info!("{} stock request: minutes={}, aggregation={:?}", symbol, window, query.aggregation);

    let result = state.aggregation.aggregate(&symbol, window).await?;
    Ok(Json(StockResponse {
        average_stock_price: with_average.then_some(result.average_price),
        price_history: result.series.points,
    }))
}

/// Query pairs are taken raw because `ticker` repeats.
async fn stock_correlation(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<CorrelationResponse>, ApiError> {
    let minutes = pairs.iter().find(|(k, _)| k == "minutes").map(|(_, v)| v.as_str());
    let tickers: Vec<&str> = pairs
        .iter()
        .filter(|(k, _)| k == "ticker")
        .map(|(_, v)| v.as_str())
        .collect();
    info!("Correlation analysis: minutes={:?}, tickers={}", minutes, tickers.join(","));

    let window = match minutes.map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_minutes(raw)?,
        _ => return Err(ApiError::BadRequest("Missing required parameter: minutes".to_string())),
    };
    let [first, second] = tickers.as_slice() else {
        return Err(ApiError::BadRequest("Exactly 2 ticker parameters are required".to_string()));
    };

    let result = state.aggregation.correlate(first, second, window).await?;
    if result.is_degraded() {
        info!("Correlation {}/{} computed on substitute data", first, second);
    }

    Ok(Json(CorrelationResponse {
        correlation: result.correlation,
        stocks: result
            .per_symbol
            .into_iter()
            .map(|(symbol, aggregate)| (symbol, aggregate.into()))
            .collect(),
    }))
}

fn parse_minutes(raw: &str) -> Result<Window, ApiError> {
    raw.trim()
        .parse::<u32>()
        .map(Window::minutes)
        .map_err(|_| ApiError::BadRequest(format!("Invalid parameter minutes: {raw:?} is not a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthetic::SyntheticSeriesGenerator;
    use crate::infrastructure::cache::InMemorySeriesCache;
    use crate::infrastructure::fetcher::{FetchPolicy, SeriesFetcher};
    use crate::infrastructure::session::SessionManager;
    use crate::infrastructure::testing::{FakeAuth, FakePrices};
    use crate::infrastructure::upstream::ProviderCredentials;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(auth: FakeAuth, prices: FakePrices) -> Router {
        let session = Arc::new(SessionManager::new(
            Arc::new(auth),
            ProviderCredentials::default(),
            Duration::from_secs(5),
        ));
        let fetcher = SeriesFetcher::new(
            session,
            Arc::new(InMemorySeriesCache::new()),
            Arc::new(prices),
            FetchPolicy::default(),
        )
        .with_synthetic(SyntheticSeriesGenerator::seeded(2024));
        router(AppState::new(AggregationService::new(Arc::new(fetcher))))
    }

    fn live_app() -> Router {
        app(
            FakeAuth::granting(Some(3600)),
            FakePrices::per_symbol(&[("AAPL", &[100.0, 200.0][..]), ("MSFT", &[300.0, 100.0][..])]),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(live_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "UP" }));
    }

    #[tokio::test]
    async fn test_stock_with_average() {
        let (status, body) = get_json(live_app(), "/stocks/AAPL?minutes=10&aggregation=average").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["averageStockPrice"], 150.0);
        assert_eq!(body["priceHistory"].as_array().unwrap().len(), 2);
        assert_eq!(body["priceHistory"][0]["price"], 100.0);
        assert!(body["priceHistory"][0]["lastUpdatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_stock_without_average() {
        let (status, body) = get_json(live_app(), "/stocks/AAPL?minutes=10").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("averageStockPrice").is_none());
        assert!(!body["priceHistory"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stock_rejects_bad_minutes() {
        let (status, body) = get_json(live_app(), "/stocks/AAPL?minutes=-5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("minutes"));
    }

    #[tokio::test]
    async fn test_correlation() {
        let (status, body) = get_json(live_app(), "/stockcorrelation?minutes=30&ticker=AAPL&ticker=MSFT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correlation"], -1.0);
        assert_eq!(body["stocks"]["AAPL"]["averagePrice"], 150.0);
        assert_eq!(body["stocks"]["MSFT"]["averagePrice"], 200.0);
        assert_eq!(body["stocks"]["MSFT"]["priceHistory"].as_array().unwrap().len(), 2);
        assert!(body["stocks"]["AAPL"]["standardDeviation"].is_number());
    }

    #[tokio::test]
    async fn test_correlation_with_provider_down_serves_substitute_data() {
        let app = app(FakeAuth::failing(), FakePrices::failing());
        let (status, body) = get_json(app, "/stockcorrelation?minutes=30&ticker=AAPL&ticker=MSFT").await;

        assert_eq!(status, StatusCode::OK);
        let correlation = body["correlation"].as_f64().unwrap();
        assert!((-0.95..=0.95).contains(&correlation), "correlation {correlation}");
        for symbol in ["AAPL", "MSFT"] {
            assert!(!body["stocks"][symbol]["priceHistory"].as_array().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_correlation_requires_two_tickers() {
        let (status, body) = get_json(live_app(), "/stockcorrelation?minutes=30&ticker=AAPL").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Exactly 2 ticker parameters are required");

        let (status, _) =
            get_json(live_app(), "/stockcorrelation?minutes=30&ticker=AAPL&ticker=MSFT&ticker=NVDA").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_correlation_requires_minutes() {
        let (status, body) = get_json(live_app(), "/stockcorrelation?ticker=AAPL&ticker=MSFT").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required parameter: minutes");
    }
}
