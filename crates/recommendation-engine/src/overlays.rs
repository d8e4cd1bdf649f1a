use analysis_core::SentimentLabel;
use portfolio_manager::PortfolioValuation;
use sentiment_analysis::{MarketSentiment, SentimentResult};

use crate::models::*;
use crate::settings::RecommendationSettings;

/// Risk factors for one position. `weight` is a fraction of total value.
pub fn risk_factors(
    bundle: &SignalBundle,
    context: &PositionContext,
    weight: f64,
    settings: &RecommendationSettings,
) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    let gain = context.current_gain_pct / 100.0;

    if weight > settings.concentration {
        factors.push(RiskFactor {
            kind: RiskFactorKind::HighConcentration,
            description: format!("High concentration ({:.1}% of portfolio)", weight * 100.0),
        });
    }

    if gain >= settings.profit_taking {
        factors.push(RiskFactor {
            kind: RiskFactorKind::LargeUnrealizedGain,
            description: "Large unrealized gains - consider profit taking".to_string(),
        });
    } else if gain <= settings.stop_loss {
        factors.push(RiskFactor {
            kind: RiskFactorKind::SignificantLoss,
            description: "Significant losses - review thesis".to_string(),
        });
    }

    if bundle.breakdown.risk.high_volatility {
        factors.push(RiskFactor {
            kind: RiskFactorKind::HighVolatility,
            description: "High recent volatility".to_string(),
        });
    }

    if bundle.breakdown.technical_confidence() < 0.5 && bundle.breakdown.sentiment_confidence() < 0.5 {
        factors.push(RiskFactor {
            kind: RiskFactorKind::LowSignalConfidence,
            description: "Low signal confidence".to_string(),
        });
    }

    factors
}

/// Portfolio-wide policy checks over the valuation snapshot.
pub fn portfolio_advisories(
    valuation: &PortfolioValuation,
    market: Option<&MarketSentiment>,
    settings: &RecommendationSettings,
) -> Vec<PortfolioAdvisory> {
    let mut advisories = Vec::new();
    let cash_pct = valuation.cash_pct();
    let total_return_pct = valuation.total_gain_loss_pct;

    if valuation.total_portfolio_value > 0.0 {
        if cash_pct / 100.0 < settings.min_cash_reserve {
            advisories.push(PortfolioAdvisory {
                kind: AdvisoryKind::CashManagement,
                action: "Consider taking profits to build cash reserves".to_string(),
                priority: Priority::Medium,
                reason: format!("Cash only {:.1}% of portfolio", cash_pct),
            });
        } else if cash_pct / 100.0 > settings.excess_cash {
            advisories.push(PortfolioAdvisory {
                kind: AdvisoryKind::CashManagement,
                action: "Consider deploying excess cash".to_string(),
                priority: Priority::Low,
                reason: format!("High cash allocation ({:.1}%)", cash_pct),
            });
        }
    }

    if total_return_pct / 100.0 >= settings.portfolio_profit_taking {
        advisories.push(PortfolioAdvisory {
            kind: AdvisoryKind::ProfitTaking,
            action: "Consider rebalancing - portfolio up significantly".to_string(),
            priority: Priority::High,
            reason: format!("Portfolio up {:.1}% - consider taking some profits", total_return_pct),
        });
    } else if total_return_pct / 100.0 <= settings.portfolio_loss_review {
        advisories.push(PortfolioAdvisory {
            kind: AdvisoryKind::LossManagement,
            action: "Review underperforming positions".to_string(),
            priority: Priority::High,
            reason: format!("Portfolio down {:.1}% - assess risk management", total_return_pct),
        });
    }

    if market.map(|m| m.label == SentimentLabel::Negative).unwrap_or(false) {
        advisories.push(PortfolioAdvisory {
            kind: AdvisoryKind::MarketTiming,
            action: "Exercise caution - negative market sentiment".to_string(),
            priority: Priority::Medium,
            reason: "Broader market sentiment is negative".to_string(),
        });
    }

    for stock in &valuation.stocks {
        let weight = valuation.weight_of(&stock.symbol);
        if weight > settings.concentration {
            advisories.push(PortfolioAdvisory {
                kind: AdvisoryKind::ConcentrationRisk,
                action: format!("Consider reducing {} position", stock.symbol),
                priority: Priority::Medium,
                reason: format!("{} is {:.1}% of portfolio (high concentration)", stock.symbol, weight * 100.0),
            });
        }
    }

    advisories
}

pub fn assess_health(total_return_pct: f64, portfolio_sentiment: Option<&SentimentResult>) -> PortfolioHealth {
    let negative = portfolio_sentiment
        .map(|s| s.label == SentimentLabel::Negative)
        .unwrap_or(false);

    if negative {
        PortfolioHealth::Poor
    } else if total_return_pct > 15.0 {
        PortfolioHealth::Excellent
    } else if total_return_pct > 5.0 {
        PortfolioHealth::Good
    } else if total_return_pct > -5.0 {
        PortfolioHealth::Fair
    } else {
        PortfolioHealth::Poor
    }
}

/// High when two or more holdings carry concentration or volatility risk,
/// or the portfolio is down past the loss-review line.
pub fn assess_risk_level(
    stocks: &[StockRecommendation],
    total_return_pct: f64,
    settings: &RecommendationSettings,
) -> RiskLevel {
    let risky = stocks
        .iter()
        .filter(|s| s.has_risk(RiskFactorKind::HighConcentration) || s.has_risk(RiskFactorKind::HighVolatility))
        .count();

    if risky >= 2 || total_return_pct / 100.0 <= settings.portfolio_loss_review {
        RiskLevel::High
    } else if risky == 1 || total_return_pct.abs() >= 20.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
