//! HTTP clients for the external market-data providers.
//!
//! Each client paces itself with its own [`RateLimiter`] and implements the
//! provider traits from `analysis-core`, so they can be composed into
//! [`analysis_core::ProviderChain`]s.

pub mod alpha_vantage;
pub mod finnhub;
pub mod marketaux;
mod rate_limiter;

pub use alpha_vantage::AlphaVantageClient;
pub use finnhub::FinnhubClient;
pub use marketaux::MarketAuxClient;
pub use rate_limiter::RateLimiter;

use analysis_core::AnalysisError;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub(crate) fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a paced request and decode the JSON body.
/// HTTP 429 maps to [`AnalysisError::RateLimited`], other non-success codes to `ApiError`.
pub(crate) async fn fetch_json(
    provider: &str,
    limiter: &RateLimiter,
    builder: RequestBuilder,
) -> Result<serde_json::Value, AnalysisError> {
    limiter.acquire().await;

    let response = builder
        .send()
        .await
        .map_err(|e| AnalysisError::ApiError(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    if status.as_u16() == 429 {
        return Err(AnalysisError::RateLimited(format!("{} returned HTTP 429", provider)));
    }
    if !status.is_success() {
        return Err(AnalysisError::ApiError(format!(
            "{} HTTP {}: {}",
            provider,
            status,
            response.text().await.unwrap_or_default()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AnalysisError::ParseError(format!("{} returned invalid JSON: {}", provider, e)))
}

/// Providers mix numbers and numeric strings ("150.25", "1.5%"); accept both.
pub(crate) fn value_as_f64(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}
