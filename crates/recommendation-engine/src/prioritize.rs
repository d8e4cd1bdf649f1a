use crate::models::*;

pub fn stock_priority(action: RecommendationAction) -> Priority {
    match action {
        RecommendationAction::StrongBuy | RecommendationAction::StrongSell => Priority::High,
        RecommendationAction::Buy | RecommendationAction::Sell => Priority::Medium,
        RecommendationAction::Hold => Priority::Low,
    }
}

/// Merge non-HOLD stock actions with every advisory, order by (priority,
/// confidence) descending and keep the first `limit`. Ties keep input order.
pub fn prioritize(
    stocks: &[StockRecommendation],
    advisories: &[PortfolioAdvisory],
    limit: usize,
) -> Vec<PriorityAction> {
    let mut actions: Vec<PriorityAction> = stocks
        .iter()
        .filter(|s| s.recommendation.action != RecommendationAction::Hold)
        .map(|s| PriorityAction::StockAction {
            symbol: s.symbol.clone(),
            action: s.recommendation.action,
            reasoning: s.recommendation.reasoning.clone(),
            priority: stock_priority(s.recommendation.action),
            confidence: s.recommendation.confidence,
        })
        .chain(advisories.iter().cloned().map(PriorityAction::Portfolio))
        .collect();

    // sort_by is stable
    actions.sort_by(|a, b| {
        b.priority()
            .rank()
            .cmp(&a.priority().rank())
            .then_with(|| b.confidence().total_cmp(&a.confidence()))
    });
    actions.truncate(limit);
    actions
}
