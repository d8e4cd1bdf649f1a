use analysis_core::{stats, OverallTechnicalSignal, SignalAction, SignalStrength};
use sentiment_analysis::SentimentResult;

use crate::models::*;
use crate::settings::RecommendationSettings;

/// Overall technical signal mapped onto [-2, 2]. Missing data scores 0.
pub fn technical_score(signal: Option<&OverallTechnicalSignal>) -> i32 {
    let Some(signal) = signal else {
        return 0;
    };
    let magnitude = match signal.strength {
        SignalStrength::Strong => 2,
        _ => 1,
    };
    match signal.action {
        SignalAction::Buy => magnitude,
        SignalAction::Sell => -magnitude,
        SignalAction::Hold => 0,
    }
}

/// Sentiment score bucketed onto [-2, 2].
pub fn sentiment_bucket(score: f64) -> i32 {
    if score > 0.2 {
        2
    } else if score > 0.05 {
        1
    } else if score < -0.2 {
        -2
    } else if score < -0.05 {
        -1
    } else {
        0
    }
}

/// Additive penalties from the position's own state. `gain_pct` and
/// `daily_change_pct` are percents.
pub fn risk_score(gain_pct: f64, daily_change_pct: Option<f64>, settings: &RecommendationSettings) -> (i32, RiskFlags) {
    let gain = gain_pct / 100.0;
    let mut score = 0;
    let mut flags = RiskFlags::default();

    if gain >= settings.profit_taking {
        score -= 2;
        flags.profit_taking = true;
    } else if gain >= settings.partial_profit {
        score -= 1;
        flags.partial_profit = true;
    }

    if gain <= settings.stop_loss {
        score -= 3;
        flags.stop_loss = true;
    }

    if daily_change_pct.map(|c| c.abs() / 100.0 >= settings.high_volatility).unwrap_or(false) {
        score -= 1;
        flags.high_volatility = true;
    }

    (score, flags)
}

pub fn score_signals(
    technical: Option<&OverallTechnicalSignal>,
    sentiment: Option<&SentimentResult>,
    context: &PositionContext,
    settings: &RecommendationSettings,
) -> SignalBundle {
    let technical_score = technical_score(technical);
    let sentiment_score = sentiment.map(|s| sentiment_bucket(s.score)).unwrap_or(0);
    let (risk_score, risk) = risk_score(context.current_gain_pct, context.daily_change_pct, settings);

    SignalBundle {
        technical_score,
        sentiment_score,
        risk_score,
        total_score: technical_score + sentiment_score + risk_score,
        breakdown: SignalBreakdown {
            technical: technical.cloned(),
            sentiment: sentiment.map(|s| SentimentBreakdown {
                score: s.score,
                label: s.label,
                confidence: s.confidence,
                article_count: s.article_count,
            }),
            risk,
        },
    }
}

/// Fixed threshold table from total score to action.
pub fn action_for_score(total_score: i32) -> (RecommendationAction, ConvictionStrength) {
    match total_score {
        s if s >= 3 => (RecommendationAction::StrongBuy, ConvictionStrength::High),
        2 => (RecommendationAction::Buy, ConvictionStrength::Moderate),
        s if s <= -3 => (RecommendationAction::StrongSell, ConvictionStrength::High),
        -2 => (RecommendationAction::Sell, ConvictionStrength::Moderate),
        _ => (RecommendationAction::Hold, ConvictionStrength::Low),
    }
}

/// 60/40 technical/sentiment blend, boosted by 20% when both scores agree in
/// sign. Always within [0, 1], rounded to two decimals.
pub fn blended_confidence(technical_score: i32, technical_conf: f64, sentiment_score: i32, sentiment_conf: f64) -> f64 {
    let mut confidence = 0.6 * technical_conf.clamp(0.0, 1.0) + 0.4 * sentiment_conf.clamp(0.0, 1.0);
    if technical_score != 0 && sentiment_score != 0 && technical_score.signum() == sentiment_score.signum() {
        confidence = (confidence * 1.2).min(1.0);
    }
    stats::round_to(confidence, 2)
}

pub fn reasoning(bundle: &SignalBundle) -> String {
    let mut parts = Vec::new();

    if bundle.technical_score != 0 {
        let direction = if bundle.technical_score > 0 { "bullish" } else { "bearish" };
        parts.push(format!("Technical indicators {}", direction));
    }
    if bundle.sentiment_score != 0 {
        let direction = if bundle.sentiment_score > 0 { "positive" } else { "negative" };
        parts.push(format!("News sentiment {}", direction));
    }

    let risk = &bundle.breakdown.risk;
    if risk.profit_taking || risk.partial_profit {
        parts.push("Consider profit taking".to_string());
    } else if risk.stop_loss {
        parts.push("Stop loss triggered".to_string());
    }

    if parts.is_empty() {
        "Mixed signals".to_string()
    } else {
        parts.join(" + ")
    }
}

/// Hold back BUY-class actions on positions at or above the size cap.
/// `weight` is a fraction of total portfolio value. SELL and HOLD pass through.
pub fn apply_position_limit(recommendation: Recommendation, weight: f64, max_position_size: f64) -> Recommendation {
    if !recommendation.action.is_buy() || weight < max_position_size {
        return recommendation;
    }

    Recommendation {
        action: RecommendationAction::Hold,
        strength: ConvictionStrength::Low,
        override_reason: Some(format!(
            "Position already {:.1}% of portfolio (max: {:.0}%)",
            weight * 100.0,
            max_position_size * 100.0
        )),
        ..recommendation
    }
}

/// Action table, confidence and reasoning, then the position-size cap.
pub fn recommend(bundle: &SignalBundle, weight: f64, settings: &RecommendationSettings) -> Recommendation {
    let (action, strength) = action_for_score(bundle.total_score);
    let recommendation = Recommendation {
        action,
        strength,
        confidence: blended_confidence(
            bundle.technical_score,
            bundle.breakdown.technical_confidence(),
            bundle.sentiment_score,
            bundle.breakdown.sentiment_confidence(),
        ),
        reasoning: reasoning(bundle),
        total_score: bundle.total_score,
        override_reason: None,
    };
    apply_position_limit(recommendation, weight, settings.max_position_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::SentimentLabel;

    fn overall(action: SignalAction, strength: SignalStrength, confidence: f64) -> OverallTechnicalSignal {
        OverallTechnicalSignal {
            action,
            strength,
            confidence,
            reason: "test".to_string(),
        }
    }

    fn sentiment(score: f64, confidence: f64) -> SentimentResult {
        SentimentResult {
            score,
            label: SentimentLabel::from_score(score),
            confidence,
            article_count: 10,
            scored_count: 10,
            ..SentimentResult::neutral("TEST")
        }
    }

    fn context(gain_pct: f64, daily: Option<f64>) -> PositionContext {
        PositionContext {
            current_gain_pct: gain_pct,
            position_weight: 5.0,
            current_price: 100.0,
            avg_cost: 100.0,
            daily_change_pct: daily,
        }
    }

    #[test]
    fn test_technical_score_mapping() {
        assert_eq!(technical_score(None), 0);
        assert_eq!(technical_score(Some(&overall(SignalAction::Buy, SignalStrength::Strong, 1.0))), 2);
        assert_eq!(technical_score(Some(&overall(SignalAction::Buy, SignalStrength::Moderate, 1.0))), 1);
        assert_eq!(technical_score(Some(&overall(SignalAction::Sell, SignalStrength::Strong, 1.0))), -2);
        assert_eq!(technical_score(Some(&overall(SignalAction::Hold, SignalStrength::Neutral, 0.3))), 0);
    }

    #[test]
    fn test_sentiment_buckets() {
        assert_eq!(sentiment_bucket(0.25), 2);
        assert_eq!(sentiment_bucket(0.2), 1);
        assert_eq!(sentiment_bucket(0.06), 1);
        assert_eq!(sentiment_bucket(0.05), 0);
        assert_eq!(sentiment_bucket(0.0), 0);
        assert_eq!(sentiment_bucket(-0.05), 0);
        assert_eq!(sentiment_bucket(-0.1), -1);
        assert_eq!(sentiment_bucket(-0.21), -2);
    }

    #[test]
    fn test_risk_penalties_are_additive() {
        let settings = RecommendationSettings::default();
        assert_eq!(risk_score(22.0, None, &settings).0, -2);
        assert_eq!(risk_score(15.0, None, &settings).0, -1);
        assert_eq!(risk_score(14.9, None, &settings).0, 0);
        assert_eq!(risk_score(-10.0, None, &settings).0, -3);
        assert_eq!(risk_score(-9.9, None, &settings).0, 0);
        assert_eq!(risk_score(-12.0, Some(-11.0), &settings).0, -4);
        assert_eq!(risk_score(25.0, Some(10.0), &settings).0, -3);

        let (_, flags) = risk_score(-12.0, Some(-11.0), &settings);
        assert!(flags.stop_loss && flags.high_volatility && !flags.profit_taking);
    }

    #[test]
    fn test_action_table() {
        assert_eq!(action_for_score(5), (RecommendationAction::StrongBuy, ConvictionStrength::High));
        assert_eq!(action_for_score(3), (RecommendationAction::StrongBuy, ConvictionStrength::High));
        assert_eq!(action_for_score(2), (RecommendationAction::Buy, ConvictionStrength::Moderate));
        assert_eq!(action_for_score(1), (RecommendationAction::Hold, ConvictionStrength::Low));
        assert_eq!(action_for_score(0), (RecommendationAction::Hold, ConvictionStrength::Low));
        assert_eq!(action_for_score(-1), (RecommendationAction::Hold, ConvictionStrength::Low));
        assert_eq!(action_for_score(-2), (RecommendationAction::Sell, ConvictionStrength::Moderate));
        assert_eq!(action_for_score(-3), (RecommendationAction::StrongSell, ConvictionStrength::High));
        assert_eq!(action_for_score(-7), (RecommendationAction::StrongSell, ConvictionStrength::High));
    }

    #[test]
    fn test_zero_scores_hold_low() {
        let settings = RecommendationSettings::default();
        let bundle = score_signals(None, None, &context(0.0, None), &settings);
        let rec = recommend(&bundle, 0.05, &settings);
        assert_eq!(rec.action, RecommendationAction::Hold);
        assert_eq!(rec.strength, ConvictionStrength::Low);
        assert_eq!(rec.reasoning, "Mixed signals");
        assert_eq!(rec.confidence, 0.0);
    }

    #[test]
    fn test_strong_buy_with_agreeing_sentiment() {
        let settings = RecommendationSettings::default();
        let technical = overall(SignalAction::Buy, SignalStrength::Strong, 1.0);
        let news = sentiment(0.25, 0.8);
        let bundle = score_signals(Some(&technical), Some(&news), &context(10.0, Some(1.0)), &settings);

        assert_eq!(bundle.technical_score, 2);
        assert_eq!(bundle.sentiment_score, 2);
        assert_eq!(bundle.risk_score, 0);
        assert_eq!(bundle.total_score, 4);

        let rec = recommend(&bundle, 0.05, &settings);
        assert_eq!(rec.action, RecommendationAction::StrongBuy);
        assert_eq!(rec.strength, ConvictionStrength::High);
        assert_eq!(rec.reasoning, "Technical indicators bullish + News sentiment positive");
        // 0.6 + 0.32 = 0.92, boosted past 1 and capped
        assert_eq!(rec.confidence, 1.0);
    }

    #[test]
    fn test_position_cap_downgrades_buy() {
        let settings = RecommendationSettings::default();
        let technical = overall(SignalAction::Buy, SignalStrength::Strong, 0.67);
        let bundle = score_signals(Some(&technical), None, &context(5.0, None), &settings);
        assert_eq!(bundle.total_score, 2);

        let rec = recommend(&bundle, 0.18, &settings);
        assert_eq!(rec.action, RecommendationAction::Hold);
        assert_eq!(rec.strength, ConvictionStrength::Low);
        assert_eq!(
            rec.override_reason.as_deref(),
            Some("Position already 18.0% of portfolio (max: 15%)")
        );

        let again = apply_position_limit(rec.clone(), 0.18, settings.max_position_size);
        assert_eq!(again, rec);
    }

    #[test]
    fn test_position_cap_applies_at_exactly_the_limit() {
        let buy = Recommendation {
            action: RecommendationAction::Buy,
            strength: ConvictionStrength::Moderate,
            confidence: 0.6,
            reasoning: "Technical indicators bullish".to_string(),
            total_score: 2,
            override_reason: None,
        };

        let at_cap = apply_position_limit(buy.clone(), 0.15, 0.15);
        assert_eq!(at_cap.action, RecommendationAction::Hold);
        assert_eq!(at_cap.strength, ConvictionStrength::Low);
        assert_eq!(
            at_cap.override_reason.as_deref(),
            Some("Position already 15.0% of portfolio (max: 15%)")
        );

        assert_eq!(apply_position_limit(buy.clone(), 0.1499, 0.15), buy);
    }

    #[test]
    fn test_position_cap_never_touches_sells() {
        let rec = Recommendation {
            action: RecommendationAction::StrongSell,
            strength: ConvictionStrength::High,
            confidence: 0.5,
            reasoning: "Stop loss triggered".to_string(),
            total_score: -4,
            override_reason: None,
        };
        assert_eq!(apply_position_limit(rec.clone(), 0.5, 0.15), rec);
    }

    #[test]
    fn test_profit_taking_alone_is_sell() {
        let settings = RecommendationSettings::default();
        let bundle = score_signals(None, None, &context(22.0, None), &settings);
        assert_eq!(bundle.risk_score, -2);

        let rec = recommend(&bundle, 0.05, &settings);
        assert_eq!(rec.action, RecommendationAction::Sell);
        assert_eq!(rec.strength, ConvictionStrength::Moderate);
        assert_eq!(rec.reasoning, "Consider profit taking");
    }

    #[test]
    fn test_stop_loss_reasoning() {
        let settings = RecommendationSettings::default();
        let bundle = score_signals(None, None, &context(-10.0, None), &settings);
        let rec = recommend(&bundle, 0.05, &settings);
        assert_eq!(rec.action, RecommendationAction::StrongSell);
        assert_eq!(rec.reasoning, "Stop loss triggered");
    }

    #[test]
    fn test_confidence_bounds() {
        for tech in -2..=2 {
            for sent in -2..=2 {
                for conf in [0.0, 0.3, 0.9, 1.0, 1.5] {
                    let c = blended_confidence(tech, conf, sent, conf);
                    assert!((0.0..=1.0).contains(&c), "{} out of range", c);
                }
            }
        }
        // disagreement gets no bonus
        assert_eq!(blended_confidence(1, 0.5, -1, 0.5), 0.5);
        assert_eq!(blended_confidence(1, 0.5, 1, 0.5), 0.6);
        assert_eq!(blended_confidence(0, 0.5, 1, 0.5), 0.5);
    }
}
