//! Error handling for the application

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the stock exchange provider.
///
/// These never reach HTTP callers: the session layer and the fetcher absorb
/// them and degrade instead.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed provider payload: {0}")]
    Malformed(String),

    #[error("invalid provider url: {0}")]
    InvalidUrl(String),

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Failures detected while computing analytics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("no price points available for {0}")]
    EmptySeries(String),
}

/// Errors surfaced at the HTTP boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AggregationError> for ApiError {
    fn from(err: AggregationError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
