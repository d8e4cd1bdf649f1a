use analysis_core::{AnalysisError, NewsArticle, NewsProvider, Quote, QuoteProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::{build_http_client, fetch_json, value_as_f64, RateLimiter};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER: &str = "Finnhub";
const COMPANY_NEWS_DAYS_BACK: i64 = 7;

/// Finnhub client: quotes and headline-only news (no per-article sentiment).
/// Free tier allows 60 requests per minute.
#[derive(Clone)]
pub struct FinnhubClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

#[derive(Debug, Deserialize)]
struct FinnhubNewsItem {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    datetime: i64,
    #[serde(default)]
    related: Option<String>,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: build_http_client(),
            rate_limiter: RateLimiter::new(PROVIDER, 60, Duration::from_secs(60)),
        }
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, AnalysisError> {
        let builder = self
            .client
            .get(format!("{}/{}", BASE_URL, endpoint))
            .query(params)
            .query(&[("token", &self.api_key)]);
        let body = fetch_json(PROVIDER, &self.rate_limiter, builder).await?;

        if let Some(msg) = body.get("error").and_then(Value::as_str) {
            if msg.to_ascii_lowercase().contains("limit") {
                return Err(AnalysisError::RateLimited(format!("{}: {}", PROVIDER, msg)));
            }
            return Err(AnalysisError::ApiError(format!("{}: {}", PROVIDER, msg)));
        }
        Ok(body)
    }
}

/// Parse a `/quote` response. Finnhub answers unknown symbols with all-zero fields.
pub fn parse_quote(symbol: &str, body: &Value) -> Option<Quote> {
    let price = value_as_f64(body.get("c"))?;
    if price <= 0.0 {
        return None;
    }

    Some(Quote {
        symbol: symbol.to_string(),
        price,
        change: value_as_f64(body.get("d")).unwrap_or(0.0),
        change_percent: value_as_f64(body.get("dp")).unwrap_or(0.0),
        volume: None,
        high: value_as_f64(body.get("h")),
        low: value_as_f64(body.get("l")),
        open: value_as_f64(body.get("o")),
        previous_close: value_as_f64(body.get("pc")),
    })
}

/// Parse a news array, keeping at most `limit` items with a headline.
pub fn parse_news(body: Value, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
    let items: Vec<FinnhubNewsItem> = serde_json::from_value(body)
        .map_err(|e| AnalysisError::ParseError(format!("{} news: {}", PROVIDER, e)))?;

    Ok(items
        .into_iter()
        .filter(|item| !item.headline.trim().is_empty())
        .take(limit)
        .map(|item| NewsArticle {
            title: item.headline,
            description: item.summary.filter(|s| !s.is_empty()),
            source: item.source,
            url: item.url,
            published_at: DateTime::from_timestamp(item.datetime, 0),
            sentiment: None,
            symbols: item
                .related
                .map(|r| {
                    r.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect())
}

#[async_trait]
impl QuoteProvider for FinnhubClient {
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, AnalysisError> {
        let body = self.get("quote", &[("symbol", symbol.to_string())]).await?;
        Ok(parse_quote(symbol, &body))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl NewsProvider for FinnhubClient {
    async fn get_news(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        let body = match symbol {
            Some(symbol) => {
                let to = Utc::now().date_naive();
                let from = to - ChronoDuration::days(COMPANY_NEWS_DAYS_BACK);
                self.get(
                    "company-news",
                    &[
                        ("symbol", symbol.to_string()),
                        ("from", from.format("%Y-%m-%d").to_string()),
                        ("to", to.format("%Y-%m-%d").to_string()),
                    ],
                )
                .await?
            }
            None => {
                self.get("news", &[("category", "general".to_string()), ("minId", "0".to_string())])
                    .await?
            }
        };
        parse_news(body, limit)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
