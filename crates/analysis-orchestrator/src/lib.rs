use analysis_core::{AnalysisError, IndicatorProvider, NewsProvider, QuoteProvider, ResponseCache};
use chrono::{DateTime, Utc};
use portfolio_manager::{
    BenchmarkComparison, Portfolio, PortfolioValuation, PortfolioValuator, ValuationResult, ValuationSettings,
};
use recommendation_engine::{
    PortfolioRecommendations, PriorityAction, RecommendationEngine, RecommendationSettings, StockRecommendation,
};
use sentiment_analysis::{
    MarketSentiment, PortfolioSentimentReport, SentimentAnalysisEngine, SentimentResult, SentimentSettings,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use technical_analysis::{TechnicalAnalysisEngine, TechnicalSettings};

#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    pub valuation: ValuationSettings,
    pub technical: TechnicalSettings,
    pub sentiment: SentimentSettings,
    pub recommendation: RecommendationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketContext {
    pub portfolio_sentiment: SentimentResult,
    pub market_sentiment: MarketSentiment,
    pub total_return_pct: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub stock_recommendations: Vec<StockRecommendation>,
    pub portfolio_recommendations: PortfolioRecommendations,
    /// At most `max_priority_actions` entries, highest priority first.
    pub prioritized_actions: Vec<PriorityAction>,
    pub market_context: MarketContext,
    pub valuation: PortfolioValuation,
    pub sentiment: PortfolioSentimentReport,
    pub timestamp: DateTime<Utc>,
}

impl RecommendationReport {
    pub fn for_symbol(&self, symbol: &str) -> Option<&StockRecommendation> {
        self.stock_recommendations.iter().find(|s| s.symbol == symbol)
    }
}

/// Wires valuation, technical and sentiment analysis into the recommendation
/// engine. Providers and the cache are injected; one cache is shared by all
/// analyzers.
pub struct AnalysisOrchestrator {
    valuator: PortfolioValuator,
    technical: TechnicalAnalysisEngine,
    sentiment: SentimentAnalysisEngine,
    engine: RecommendationEngine,
}

impl AnalysisOrchestrator {
    pub fn new(
        quotes: Arc<dyn QuoteProvider>,
        indicators: Arc<dyn IndicatorProvider>,
        news: Arc<dyn NewsProvider>,
        cache: Arc<ResponseCache>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            valuator: PortfolioValuator::new(quotes, cache.clone(), settings.valuation),
            technical: TechnicalAnalysisEngine::new(indicators, cache.clone(), settings.technical),
            sentiment: SentimentAnalysisEngine::new(news, cache, settings.sentiment),
            engine: RecommendationEngine::new(settings.recommendation),
        }
    }

    pub fn valuator(&self) -> &PortfolioValuator {
        &self.valuator
    }

    pub fn technical_engine(&self) -> &TechnicalAnalysisEngine {
        &self.technical
    }

    pub fn sentiment_engine(&self) -> &SentimentAnalysisEngine {
        &self.sentiment
    }

    pub async fn value_portfolio(&self, portfolio: &Portfolio) -> PortfolioValuation {
        self.valuator.value_portfolio(portfolio).await
    }

    pub async fn compare_to_benchmark(
        &self,
        valuation: &PortfolioValuation,
        benchmark_symbol: &str,
    ) -> Option<BenchmarkComparison> {
        self.valuator.compare_to_benchmark(valuation, benchmark_symbol).await
    }

    /// Full cycle: value, analyze every holding, recommend, prioritize.
    pub async fn generate_recommendations(&self, portfolio: &Portfolio) -> RecommendationReport {
        let valuation = self.value_portfolio(portfolio).await;
        self.recommend_from_valuation(valuation).await
    }

    /// Recommendation cycle over an existing valuation snapshot.
    pub async fn recommend_from_valuation(&self, valuation: PortfolioValuation) -> RecommendationReport {
        tracing::info!("Generating recommendations for {} stocks", valuation.stocks.len());

        let symbols: Vec<String> = valuation.stocks.iter().map(|s| s.symbol.clone()).collect();
        let sentiment = self.sentiment.analyze_portfolio(&symbols).await;

        let mut stock_recommendations = Vec::with_capacity(valuation.stocks.len());
        for position in &valuation.stocks {
            match self.recommend_position(position, &valuation, &sentiment).await {
                Ok(rec) => {
                    tracing::info!(
                        "{}: {} ({:.0}% confidence)",
                        rec.symbol,
                        rec.recommendation.action,
                        rec.recommendation.confidence * 100.0
                    );
                    stock_recommendations.push(rec);
                }
                Err(e) => tracing::warn!("Skipping recommendation for {}: {}", position.symbol, e),
            }
        }

        let portfolio_recommendations = self.engine.portfolio_recommendations(
            &valuation,
            &stock_recommendations,
            Some(&sentiment.portfolio_sentiment),
            Some(&sentiment.market_sentiment),
        );
        let prioritized_actions = self.engine.prioritize(&stock_recommendations, &portfolio_recommendations);

        tracing::info!(
            "Recommendations complete: {} stock, {} portfolio, {} prioritized",
            stock_recommendations.len(),
            portfolio_recommendations.advisories.len(),
            prioritized_actions.len()
        );

        RecommendationReport {
            market_context: MarketContext {
                portfolio_sentiment: sentiment.portfolio_sentiment.clone(),
                market_sentiment: sentiment.market_sentiment.clone(),
                total_return_pct: valuation.total_gain_loss_pct,
                total_value: valuation.total_portfolio_value,
            },
            stock_recommendations,
            portfolio_recommendations,
            prioritized_actions,
            valuation,
            sentiment,
            timestamp: Utc::now(),
        }
    }

    async fn recommend_position(
        &self,
        position: &ValuationResult,
        valuation: &PortfolioValuation,
        sentiment: &PortfolioSentimentReport,
    ) -> Result<StockRecommendation, AnalysisError> {
        if !position.current_value.is_finite() || !position.gain_loss_pct.is_finite() {
            return Err(AnalysisError::InvalidData(format!(
                "non-finite valuation for {}",
                position.symbol
            )));
        }

        let technical = self.technical.analyze(&position.symbol).await;
        let weight = valuation.weight_of(&position.symbol);

        Ok(self.engine.recommend_stock(
            position,
            weight,
            Some(&technical),
            sentiment.for_symbol(&position.symbol),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{
        ArticleSentiment, IndicatorRequest, IndicatorSeries, IndicatorValue, NewsArticle, Quote,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use recommendation_engine::{AdvisoryKind, RecommendationAction};
    use std::collections::HashMap;

    struct FixedQuotes(HashMap<String, f64>);

    #[async_trait]
    impl QuoteProvider for FixedQuotes {
        async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, AnalysisError> {
            Ok(self.0.get(symbol).map(|price| Quote {
                symbol: symbol.to_string(),
                price: *price,
                change: 0.5,
                change_percent: 0.3,
                volume: None,
                high: None,
                low: None,
                open: None,
                previous_close: None,
            }))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// Serves an RSI series for listed symbols, nothing else.
    struct RsiOnly(HashMap<String, f64>);

    #[async_trait]
    impl IndicatorProvider for RsiOnly {
        async fn get_technical_indicator(
            &self,
            symbol: &str,
            request: IndicatorRequest,
        ) -> Result<Option<IndicatorSeries>, AnalysisError> {
            let (IndicatorRequest::Rsi { .. }, Some(rsi)) = (request, self.0.get(symbol)) else {
                return Ok(None);
            };
            let mut series = IndicatorSeries::new(request);
            for day in 1..=5 {
                let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
                series.values.insert(date, IndicatorValue::Single(*rsi));
            }
            Ok(Some(series))
        }

        fn name(&self) -> &str {
            "rsi-only"
        }
    }

    struct ScoredNews {
        per_symbol: HashMap<String, f64>,
        market: f64,
    }

    fn articles(tag: &str, score: f64, count: usize) -> Vec<NewsArticle> {
        (0..count)
            .map(|i| NewsArticle {
                title: format!("{} headline {}", tag, i),
                description: None,
                source: "Wire".to_string(),
                url: format!("https://news.test/{}/{}", tag, i),
                published_at: None,
                sentiment: Some(ArticleSentiment::from_score(score)),
                symbols: vec![tag.to_string()],
            })
            .collect()
    }

    #[async_trait]
    impl NewsProvider for ScoredNews {
        async fn get_news(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
            let mut out = match symbol {
                Some(s) => match self.per_symbol.get(s) {
                    Some(score) => articles(s, *score, 10),
                    None => return Err(AnalysisError::ApiError("no feed".to_string())),
                },
                None => articles("market", self.market, 10),
            };
            out.truncate(limit);
            Ok(out)
        }

        fn name(&self) -> &str {
            "scored"
        }
    }

    fn orchestrator(market: f64) -> AnalysisOrchestrator {
        let quotes = FixedQuotes(HashMap::from([("AAPL".to_string(), 165.0), ("MSFT".to_string(), 380.0)]));
        let indicators = RsiOnly(HashMap::from([("AAPL".to_string(), 15.0)]));
        let news = ScoredNews {
            per_symbol: HashMap::from([("AAPL".to_string(), 0.3)]),
            market,
        };
        AnalysisOrchestrator::new(
            Arc::new(quotes),
            Arc::new(indicators),
            Arc::new(news),
            Arc::new(ResponseCache::new()),
            OrchestratorSettings::default(),
        )
    }

    fn portfolio() -> Portfolio {
        let mut portfolio = Portfolio::default();
        portfolio.add_position("AAPL", 10.0, 150.0, None).unwrap();
        portfolio.add_position("MSFT", 10.0, 400.0, None).unwrap();
        portfolio.add_position("GONE", 10.0, 50.0, None).unwrap();
        portfolio.set_cash(20_000.0).unwrap();
        portfolio
    }

    #[tokio::test]
    async fn test_generate_recommendations_end_to_end() {
        let report = orchestrator(0.0).generate_recommendations(&portfolio()).await;

        assert_eq!(report.stock_recommendations.len(), 3);
        assert!(report.prioritized_actions.len() <= 10);

        // RSI 15 => strong buy alone sums to +2 => moderate buy => +1; sentiment 0.3 => +2
        let aapl = report.for_symbol("AAPL").unwrap();
        assert_eq!(aapl.signals.technical_score, 1);
        assert_eq!(aapl.signals.sentiment_score, 2);
        assert_eq!(aapl.recommendation.action, RecommendationAction::StrongBuy);

        // no technicals, no news, small loss
        let msft = report.for_symbol("MSFT").unwrap();
        assert_eq!(msft.recommendation.action, RecommendationAction::Hold);

        // unpriced holding is valued at cost
        assert_eq!(report.valuation.position("GONE").unwrap().current_price, 50.0);

        assert_eq!(report.market_context.total_value, 1650.0 + 3800.0 + 500.0 + 20_000.0);
        assert!(report
            .portfolio_recommendations
            .advisories
            .iter()
            .any(|a| a.kind == AdvisoryKind::CashManagement));
        assert!(matches!(
            &report.prioritized_actions[0],
            PriorityAction::StockAction { symbol, .. } if symbol == "AAPL"
        ));
    }

    #[tokio::test]
    async fn test_negative_market_adds_timing_advisory() {
        let report = orchestrator(-0.5).generate_recommendations(&portfolio()).await;
        assert_eq!(report.market_context.market_sentiment.label, analysis_core::SentimentLabel::Negative);
        assert!(report
            .portfolio_recommendations
            .advisories
            .iter()
            .any(|a| a.kind == AdvisoryKind::MarketTiming));
    }

    #[tokio::test]
    async fn test_empty_portfolio() {
        let report = orchestrator(0.0).generate_recommendations(&Portfolio::default()).await;
        assert!(report.stock_recommendations.is_empty());
        assert!(report.prioritized_actions.is_empty());
        assert_eq!(report.market_context.total_value, 0.0);
    }
}
