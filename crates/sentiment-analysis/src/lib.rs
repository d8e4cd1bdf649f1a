use analysis_core::{NewsProvider, ResponseCache, SentimentLabel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod scoring;
pub use scoring::*;

/// Topic tag extracted from a holding's headlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsTheme {
    Earnings,
    AnalystUpgrade,
    AnalystDowngrade,
    BusinessDevelopment,
}

impl NewsTheme {
    pub const ALL: [NewsTheme; 4] = [
        NewsTheme::Earnings,
        NewsTheme::AnalystUpgrade,
        NewsTheme::AnalystDowngrade,
        NewsTheme::BusinessDevelopment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsTheme::Earnings => "earnings",
            NewsTheme::AnalystUpgrade => "analyst_upgrade",
            NewsTheme::AnalystDowngrade => "analyst_downgrade",
            NewsTheme::BusinessDevelopment => "business_development",
        }
    }
}

/// Topic tag extracted from general market headlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTopic {
    MonetaryPolicy,
    Inflation,
    EarningsSeason,
    AiTechnology,
    Cryptocurrency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketMood {
    Bullish,
    Optimistic,
    Neutral,
    Pessimistic,
    Bearish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlineSummary {
    pub title: String,
    pub source: String,
    pub sentiment: SentimentLabel,
    pub published_at: Option<DateTime<Utc>>,
}

/// Aggregated polarity for one subject (a symbol, `portfolio`, or `market`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub subject: String,
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    /// Articles fetched, whether or not they carried a score.
    pub article_count: usize,
    /// Articles that contributed to `score`.
    pub scored_count: usize,
    pub themes: Vec<NewsTheme>,
    pub recent_headlines: Vec<HeadlineSummary>,
}

impl SentimentResult {
    pub fn neutral(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            score: 0.0,
            label: SentimentLabel::Neutral,
            confidence: 0.0,
            article_count: 0,
            scored_count: 0,
            themes: Vec::new(),
            recent_headlines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub mood: MarketMood,
    pub trending_topics: Vec<MarketTopic>,
    pub article_count: usize,
}

impl MarketSentiment {
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
            confidence: 0.0,
            mood: MarketMood::Neutral,
            trending_topics: Vec::new(),
            article_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsHighlight {
    pub symbol: String,
    pub title: String,
    pub sentiment: SentimentLabel,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub overall_mood: SentimentLabel,
    pub positive_stocks: Vec<String>,
    pub negative_stocks: Vec<String>,
    pub neutral_stocks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSentimentReport {
    pub portfolio_sentiment: SentimentResult,
    pub stock_sentiments: Vec<SentimentResult>,
    pub market_sentiment: MarketSentiment,
    pub news_highlights: Vec<NewsHighlight>,
    pub summary: SentimentSummary,
    pub analyzed_at: DateTime<Utc>,
}

impl PortfolioSentimentReport {
    pub fn for_symbol(&self, symbol: &str) -> Option<&SentimentResult> {
        self.stock_sentiments.iter().find(|s| s.subject == symbol)
    }
}

#[derive(Debug, Clone)]
pub struct SentimentSettings {
    pub news_limit: usize,
    pub market_news_limit: usize,
    pub window: ScoringWindow,
    pub symbol_ttl: Duration,
    pub market_ttl: Duration,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            news_limit: 20,
            market_news_limit: 20,
            window: ScoringWindow::default(),
            symbol_ttl: Duration::from_secs(3600),
            market_ttl: Duration::from_secs(1800),
        }
    }
}

pub struct SentimentAnalysisEngine {
    news: Arc<dyn NewsProvider>,
    cache: Arc<ResponseCache>,
    settings: SentimentSettings,
}

impl SentimentAnalysisEngine {
    pub fn new(news: Arc<dyn NewsProvider>, cache: Arc<ResponseCache>, settings: SentimentSettings) -> Self {
        Self { news, cache, settings }
    }

    /// Sentiment for one symbol. Provider failures degrade to a neutral, zero-confidence result.
    pub async fn analyze_symbol(&self, symbol: &str) -> SentimentResult {
        let cache_key = format!("sentiment:{}", symbol);
        if let Some(cached) = self.cache.get::<SentimentResult>(&cache_key) {
            return cached;
        }

        match self.news.get_news(Some(symbol), self.settings.news_limit).await {
            Ok(articles) => {
                let result = score_symbol(symbol, &articles, self.settings.window);
                tracing::debug!(
                    "Sentiment for {}: {:.3} ({}) from {}/{} articles",
                    symbol,
                    result.score,
                    result.label.as_str(),
                    result.scored_count,
                    result.article_count
                );
                self.cache.set(&cache_key, &result, self.settings.symbol_ttl);
                result
            }
            Err(e) => {
                tracing::warn!("Sentiment analysis failed for {}: {}", symbol, e);
                SentimentResult::neutral(symbol)
            }
        }
    }

    pub async fn analyze_market(&self) -> MarketSentiment {
        let cache_key = "sentiment:market";
        if let Some(cached) = self.cache.get::<MarketSentiment>(cache_key) {
            return cached;
        }

        match self.news.get_news(None, self.settings.market_news_limit).await {
            Ok(articles) => {
                let (result, trending_topics) = score_market(&articles);
                let market = MarketSentiment {
                    score: result.score,
                    label: result.label,
                    confidence: result.confidence,
                    mood: market_mood(result.score),
                    trending_topics,
                    article_count: result.article_count,
                };
                self.cache.set(cache_key, &market, self.settings.market_ttl);
                market
            }
            Err(e) => {
                tracing::warn!("Market sentiment analysis failed: {}", e);
                MarketSentiment::neutral()
            }
        }
    }

    /// Per-symbol, aggregate, and market sentiment for a set of holdings.
    pub async fn analyze_portfolio(&self, symbols: &[String]) -> PortfolioSentimentReport {
        tracing::info!("Analyzing sentiment for {} stocks", symbols.len());

        let mut stock_sentiments = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            stock_sentiments.push(self.analyze_symbol(symbol).await);
        }

        let portfolio_sentiment = aggregate_portfolio(&stock_sentiments);
        let market_sentiment = self.analyze_market().await;

        PortfolioSentimentReport {
            news_highlights: news_highlights(&stock_sentiments),
            summary: summarize(&portfolio_sentiment, &stock_sentiments),
            portfolio_sentiment,
            stock_sentiments,
            market_sentiment,
            analyzed_at: Utc::now(),
        }
    }
}
