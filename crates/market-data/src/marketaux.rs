use analysis_core::{AnalysisError, ArticleSentiment, NewsArticle, NewsProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::{build_http_client, fetch_json, RateLimiter};

const BASE_URL: &str = "https://api.marketaux.com/v1";
const PROVIDER: &str = "MarketAux";

/// MarketAux client: news with per-entity sentiment scores.
#[derive(Clone)]
pub struct MarketAuxClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    data: Vec<MarketAuxArticle>,
}

#[derive(Debug, Deserialize)]
struct MarketAuxArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    sentiment_score: Option<f64>,
}

impl MarketAuxClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: build_http_client(),
            rate_limiter: RateLimiter::per_interval(PROVIDER, Duration::from_secs(2)),
        }
    }
}

/// Article polarity is the mean of its entities' sentiment scores; `None` when no entity is scored.
fn article_sentiment(entities: &[Entity]) -> Option<ArticleSentiment> {
    let scores: Vec<f64> = entities.iter().filter_map(|e| e.sentiment_score).collect();
    if scores.is_empty() {
        return None;
    }
    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    Some(ArticleSentiment::from_score(avg.clamp(-1.0, 1.0)))
}

/// Parse a `news/all` response.
pub fn parse_news(body: Value) -> Result<Vec<NewsArticle>, AnalysisError> {
    if let Some(err) = body.get("error") {
        let code = err.get("code").and_then(Value::as_str).unwrap_or_default();
        let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
        if code.contains("limit") {
            return Err(AnalysisError::RateLimited(format!("{}: {}", PROVIDER, message)));
        }
        return Err(AnalysisError::ApiError(format!("{}: {}", PROVIDER, message)));
    }

    let response: NewsResponse = serde_json::from_value(body)
        .map_err(|e| AnalysisError::ParseError(format!("{} news: {}", PROVIDER, e)))?;

    Ok(response
        .data
        .into_iter()
        .filter(|a| !a.title.trim().is_empty())
        .map(|a| NewsArticle {
            sentiment: article_sentiment(&a.entities),
            symbols: a.entities.iter().filter_map(|e| e.symbol.clone()).collect(),
            title: a.title,
            description: a.description.filter(|d| !d.is_empty()),
            source: a.source,
            url: a.url,
            published_at: a
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&Utc)),
        })
        .collect())
}

#[async_trait]
impl NewsProvider for MarketAuxClient {
    async fn get_news(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        let mut params = vec![
            ("language", "en".to_string()),
            ("filter_entities", "true".to_string()),
            ("limit", limit.to_string()),
            ("api_token", self.api_key.clone()),
        ];
        if let Some(symbol) = symbol {
            params.push(("symbols", symbol.to_string()));
        }

        let builder = self.client.get(format!("{}/news/all", BASE_URL)).query(&params);
        let body = fetch_json(PROVIDER, &self.rate_limiter, builder).await?;
        let mut articles = parse_news(body)?;
        articles.truncate(limit);
        Ok(articles)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
