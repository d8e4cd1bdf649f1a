use portfolio_manager::{PortfolioValuation, ValuationResult};
use sentiment_analysis::{MarketSentiment, SentimentResult};
use technical_analysis::TechnicalAnalysis;

use crate::models::*;
use crate::overlays;
use crate::prioritize;
use crate::scoring;
use crate::settings::RecommendationSettings;

/// Turns per-instrument analyses plus the valuation snapshot into
/// recommendations. Pure; all I/O happens before it is called.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    settings: RecommendationSettings,
}

impl RecommendationEngine {
    pub fn new(settings: RecommendationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    /// `weight` is the position's fraction of total portfolio value.
    pub fn recommend_stock(
        &self,
        position: &ValuationResult,
        weight: f64,
        technical: Option<&TechnicalAnalysis>,
        sentiment: Option<&SentimentResult>,
    ) -> StockRecommendation {
        let context = PositionContext {
            current_gain_pct: position.gain_loss_pct,
            position_weight: weight * 100.0,
            current_price: position.current_price,
            avg_cost: position.avg_price,
            daily_change_pct: position.price_change_pct,
        };

        let signals = scoring::score_signals(
            technical.map(|t| &t.overall_signal),
            sentiment,
            &context,
            &self.settings,
        );
        let recommendation = scoring::recommend(&signals, weight, &self.settings);
        let risk_factors = overlays::risk_factors(&signals, &context, weight, &self.settings);

        if let Some(reason) = &recommendation.override_reason {
            tracing::debug!("{} held back: {}", position.symbol, reason);
        }

        StockRecommendation {
            symbol: position.symbol.clone(),
            technical_summary: summarize_technical(technical),
            sentiment_summary: summarize_sentiment(sentiment),
            recommendation,
            signals,
            context,
            risk_factors,
        }
    }

    pub fn portfolio_recommendations(
        &self,
        valuation: &PortfolioValuation,
        stocks: &[StockRecommendation],
        portfolio_sentiment: Option<&SentimentResult>,
        market: Option<&MarketSentiment>,
    ) -> PortfolioRecommendations {
        let total_return_pct = valuation.total_gain_loss_pct;
        PortfolioRecommendations {
            advisories: overlays::portfolio_advisories(valuation, market, &self.settings),
            portfolio_health: overlays::assess_health(total_return_pct, portfolio_sentiment),
            risk_level: overlays::assess_risk_level(stocks, total_return_pct, &self.settings),
            cash_pct: valuation.cash_pct(),
            total_return_pct,
        }
    }

    pub fn prioritize(&self, stocks: &[StockRecommendation], portfolio: &PortfolioRecommendations) -> Vec<PriorityAction> {
        prioritize::prioritize(stocks, &portfolio.advisories, self.settings.max_priority_actions)
    }
}

fn summarize_technical(technical: Option<&TechnicalAnalysis>) -> String {
    let Some(technical) = technical.filter(|t| t.indicator_count() > 0) else {
        return "Technical data unavailable".to_string();
    };

    let overall = &technical.overall_signal;
    let mut summary = format!(
        "{:?} ({:?}, {:.0}% confidence)",
        overall.action,
        overall.strength,
        overall.confidence * 100.0
    )
    .to_lowercase();
    if let Some(rsi) = &technical.rsi {
        summary.push_str(&format!(" - {}", rsi.signal.reason));
    }
    summary
}

fn summarize_sentiment(sentiment: Option<&SentimentResult>) -> String {
    match sentiment {
        Some(s) if s.article_count > 0 => {
            let mut summary = format!("{} ({:+.2}, {} articles)", s.label.as_str(), s.score, s.article_count);
            if !s.themes.is_empty() {
                let themes: Vec<&str> = s.themes.iter().map(|t| t.as_str()).collect();
                summary.push_str(&format!(" - {}", themes.join(", ")));
            }
            summary
        }
        _ => "No recent news".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{SentimentLabel, SignalAction, SignalStrength, TechnicalSignal};
    use chrono::Utc;
    use portfolio_manager::PriceSource;
    use technical_analysis::{MacdAnalysis, RsiAnalysis, SmaAnalysis, Trend};

    fn position(symbol: &str, shares: f64, avg: f64, price: f64, daily: Option<f64>) -> ValuationResult {
        let invested = shares * avg;
        let value = shares * price;
        ValuationResult {
            symbol: symbol.to_string(),
            shares,
            avg_price: avg,
            current_price: price,
            total_invested: invested,
            current_value: value,
            gain_loss: value - invested,
            gain_loss_pct: (value - invested) / invested * 100.0,
            price_change: daily.map(|d| price * d / 100.0),
            price_change_pct: daily,
            volume: None,
            high: None,
            low: None,
            previous_close: None,
            price_source: PriceSource::Live,
        }
    }

    fn bullish_technicals(symbol: &str) -> TechnicalAnalysis {
        let date = Utc::now().date_naive();
        let rsi = RsiAnalysis {
            symbol: symbol.to_string(),
            period: 14,
            current_rsi: 18.0,
            signal: TechnicalSignal::new(SignalAction::Buy, SignalStrength::Strong, 2, "Oversold (RSI: 18.0)"),
            trend: Trend::Falling,
            historical_values: vec![18.0, 22.0, 30.0],
            last_updated: date,
        };
        let macd = MacdAnalysis {
            symbol: symbol.to_string(),
            macd_line: 1.2,
            signal_line: 0.8,
            histogram: 0.4,
            signal: TechnicalSignal::new(SignalAction::Buy, SignalStrength::Moderate, 1, "MACD bullish crossover"),
            last_updated: date,
        };
        let sma = SmaAnalysis {
            symbol: symbol.to_string(),
            short_period: 20,
            long_period: 50,
            short_sma: 160.0,
            long_sma: 150.0,
            signal: TechnicalSignal::new(
                SignalAction::Buy,
                SignalStrength::Strong,
                2,
                "Short SMA above long SMA (160.00 > 150.00)",
            ),
            last_updated: date,
        };
        TechnicalAnalysis::from_parts(symbol, Some(rsi), Some(macd), Some(sma))
    }

    fn positive_news(symbol: &str, score: f64) -> SentimentResult {
        SentimentResult {
            score,
            label: SentimentLabel::from_score(score),
            confidence: 1.0,
            article_count: 12,
            scored_count: 10,
            ..SentimentResult::neutral(symbol)
        }
    }

    #[test]
    fn test_strong_buy_with_full_agreement() {
        let engine = RecommendationEngine::default();
        let aapl = position("AAPL", 10.0, 150.0, 165.0, Some(1.2));
        let technical = bullish_technicals("AAPL");
        let news = positive_news("AAPL", 0.25);

        let rec = engine.recommend_stock(&aapl, 0.10, Some(&technical), Some(&news));

        assert_eq!(rec.signals.technical_score, 2);
        assert_eq!(rec.signals.sentiment_score, 2);
        assert_eq!(rec.signals.risk_score, 0);
        assert_eq!(rec.recommendation.action, RecommendationAction::StrongBuy);
        assert_eq!(rec.recommendation.strength, ConvictionStrength::High);
        assert!(rec.recommendation.override_reason.is_none());
        assert!(rec.risk_factors.is_empty());
        assert!(rec.technical_summary.starts_with("buy (strong, 100% confidence)"));
        assert_eq!(rec.sentiment_summary, "positive (+0.25, 12 articles)");
        assert_eq!(rec.context.position_weight, 10.0);
    }

    #[test]
    fn test_oversized_position_is_held() {
        let engine = RecommendationEngine::default();
        let xyz = position("XYZ", 100.0, 18.0, 18.0, None);
        let technical = bullish_technicals("XYZ");

        let rec = engine.recommend_stock(&xyz, 0.18, Some(&technical), None);
        assert_eq!(rec.signals.total_score, 2);
        assert_eq!(rec.recommendation.action, RecommendationAction::Hold);
        assert_eq!(
            rec.recommendation.override_reason.as_deref(),
            Some("Position already 18.0% of portfolio (max: 15%)")
        );
        assert!(rec.has_risk(RiskFactorKind::HighConcentration));
        assert_eq!(rec.sentiment_summary, "No recent news");
    }

    #[test]
    fn test_missing_analyses_degrade_to_hold() {
        let engine = RecommendationEngine::default();
        let quiet = position("QQQ", 1.0, 100.0, 101.0, None);
        let rec = engine.recommend_stock(&quiet, 0.05, None, None);

        assert_eq!(rec.recommendation.action, RecommendationAction::Hold);
        assert_eq!(rec.recommendation.confidence, 0.0);
        assert_eq!(rec.technical_summary, "Technical data unavailable");
        assert!(rec.has_risk(RiskFactorKind::LowSignalConfidence));
    }

    #[test]
    fn test_gain_above_threshold_sells() {
        let engine = RecommendationEngine::default();
        let winner = position("WIN", 10.0, 100.0, 122.0, None);
        let rec = engine.recommend_stock(&winner, 0.05, None, None);

        assert_eq!(rec.signals.risk_score, -2);
        assert_eq!(rec.recommendation.action, RecommendationAction::Sell);
        assert!(rec.has_risk(RiskFactorKind::LargeUnrealizedGain));
    }

    #[test]
    fn test_risk_level_from_stock_factors() {
        let engine = RecommendationEngine::default();
        let settings = engine.settings().clone();
        let volatile = position("VOL", 10.0, 100.0, 100.0, Some(-12.0));
        let heavy = position("BIG", 10.0, 100.0, 100.0, None);

        let one = vec![engine.recommend_stock(&volatile, 0.05, None, None)];
        assert_eq!(overlays::assess_risk_level(&one, 0.0, &settings), RiskLevel::Medium);

        let two = vec![
            engine.recommend_stock(&volatile, 0.05, None, None),
            engine.recommend_stock(&heavy, 0.40, None, None),
        ];
        assert_eq!(overlays::assess_risk_level(&two, 0.0, &settings), RiskLevel::High);
        assert_eq!(overlays::assess_risk_level(&[], 0.0, &settings), RiskLevel::Low);
        assert_eq!(overlays::assess_risk_level(&[], -16.0, &settings), RiskLevel::High);
    }

    #[test]
    fn test_prioritized_list_orders_stock_actions_and_advisories() {
        let engine = RecommendationEngine::default();
        let aapl = position("AAPL", 10.0, 150.0, 165.0, None);
        let loser = position("DOWN", 10.0, 100.0, 85.0, None);
        let technical = bullish_technicals("AAPL");
        let news = positive_news("AAPL", 0.25);

        let stocks = vec![
            engine.recommend_stock(&loser, 0.05, None, None),
            engine.recommend_stock(&aapl, 0.10, Some(&technical), Some(&news)),
        ];
        let portfolio = PortfolioRecommendations {
            advisories: vec![PortfolioAdvisory {
                kind: AdvisoryKind::CashManagement,
                action: "Consider deploying excess cash".to_string(),
                priority: Priority::Low,
                reason: "High cash allocation (30.0%)".to_string(),
            }],
            portfolio_health: PortfolioHealth::Fair,
            risk_level: RiskLevel::Low,
            cash_pct: 30.0,
            total_return_pct: 0.0,
        };

        let actions = engine.prioritize(&stocks, &portfolio);
        assert_eq!(actions.len(), 3);
        // both STRONG actions are high priority; AAPL has more confidence
        match &actions[0] {
            PriorityAction::StockAction { symbol, .. } => assert_eq!(symbol, "AAPL"),
            other => panic!("unexpected {:?}", other),
        }
        match &actions[1] {
            PriorityAction::StockAction { symbol, action, .. } => {
                assert_eq!(symbol, "DOWN");
                assert_eq!(*action, RecommendationAction::StrongSell);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(actions[2], PriorityAction::Portfolio(_)));
    }
}
