/// Thresholds driving scoring and portfolio overlays. Fractions, not percents.
#[derive(Debug, Clone)]
pub struct RecommendationSettings {
    /// Largest weight a position may have before BUY signals are held back.
    pub max_position_size: f64,
    pub profit_taking: f64,
    pub partial_profit: f64,
    /// Negative; an unrealized return at or below this triggers the stop-loss penalty.
    pub stop_loss: f64,
    pub high_volatility: f64,
    pub min_cash_reserve: f64,
    pub excess_cash: f64,
    /// Aggregate return that triggers a profit-taking advisory.
    pub portfolio_profit_taking: f64,
    pub portfolio_loss_review: f64,
    /// Weight above which a holding gets a concentration advisory.
    pub concentration: f64,
    pub max_priority_actions: usize,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            max_position_size: 0.15,
            profit_taking: 0.20,
            partial_profit: 0.15,
            stop_loss: -0.10,
            high_volatility: 0.10,
            min_cash_reserve: 0.05,
            excess_cash: 0.20,
            portfolio_profit_taking: 0.25,
            portfolio_loss_review: -0.15,
            concentration: 0.15,
            max_priority_actions: 10,
        }
    }
}
