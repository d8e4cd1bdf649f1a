use analysis_core::{OverallTechnicalSignal, SentimentLabel};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationAction {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl RecommendationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG SELL",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::StrongBuy | Self::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Self::StrongSell | Self::Sell)
    }
}

impl fmt::Display for RecommendationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvictionStrength {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Which portfolio-context penalties fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlags {
    pub profit_taking: bool,
    pub partial_profit: bool,
    pub stop_loss: bool,
    pub high_volatility: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub article_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalBreakdown {
    pub technical: Option<OverallTechnicalSignal>,
    pub sentiment: Option<SentimentBreakdown>,
    pub risk: RiskFlags,
}

impl SignalBreakdown {
    pub fn technical_confidence(&self) -> f64 {
        self.technical.as_ref().map(|t| t.confidence).unwrap_or(0.0)
    }

    pub fn sentiment_confidence(&self) -> f64 {
        self.sentiment.as_ref().map(|s| s.confidence).unwrap_or(0.0)
    }
}

/// Per-instrument scores feeding the action table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalBundle {
    pub technical_score: i32,
    pub sentiment_score: i32,
    pub risk_score: i32,
    pub total_score: i32,
    pub breakdown: SignalBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendationAction,
    pub strength: ConvictionStrength,
    pub confidence: f64,
    pub reasoning: String,
    pub total_score: i32,
    /// Set when the position-size cap downgraded a buy.
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionContext {
    pub current_gain_pct: f64,
    /// Percent of total portfolio value, cash included.
    pub position_weight: f64,
    pub current_price: f64,
    pub avg_cost: f64,
    pub daily_change_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    HighConcentration,
    LargeUnrealizedGain,
    SignificantLoss,
    HighVolatility,
    LowSignalConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: RiskFactorKind,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecommendation {
    pub symbol: String,
    pub recommendation: Recommendation,
    pub signals: SignalBundle,
    pub context: PositionContext,
    pub technical_summary: String,
    pub sentiment_summary: String,
    pub risk_factors: Vec<RiskFactor>,
}

impl StockRecommendation {
    pub fn has_risk(&self, kind: RiskFactorKind) -> bool {
        self.risk_factors.iter().any(|r| r.kind == kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    CashManagement,
    ProfitTaking,
    LossManagement,
    MarketTiming,
    ConcentrationRisk,
}

impl AdvisoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashManagement => "cash_management",
            Self::ProfitTaking => "profit_taking",
            Self::LossManagement => "loss_management",
            Self::MarketTiming => "market_timing",
            Self::ConcentrationRisk => "concentration_risk",
        }
    }
}

/// A portfolio-wide observation, independent of per-instrument signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAdvisory {
    pub kind: AdvisoryKind,
    pub action: String,
    pub priority: Priority,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRecommendations {
    pub advisories: Vec<PortfolioAdvisory>,
    pub portfolio_health: PortfolioHealth,
    pub risk_level: RiskLevel,
    pub cash_pct: f64,
    pub total_return_pct: f64,
}

/// One entry of the ranked action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriorityAction {
    StockAction {
        symbol: String,
        action: RecommendationAction,
        reasoning: String,
        priority: Priority,
        confidence: f64,
    },
    Portfolio(PortfolioAdvisory),
}

impl PriorityAction {
    pub fn priority(&self) -> Priority {
        match self {
            Self::StockAction { priority, .. } => *priority,
            Self::Portfolio(advisory) => advisory.priority,
        }
    }

    /// Advisories carry no confidence and sort as zero.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::StockAction { confidence, .. } => *confidence,
            Self::Portfolio(_) => 0.0,
        }
    }

    /// Single-line text for reports.
    pub fn describe(&self) -> String {
        match self {
            Self::StockAction { symbol, action, reasoning, .. } => {
                format!("{} {}: {}", action, symbol, reasoning)
            }
            Self::Portfolio(advisory) => format!("{} ({})", advisory.action, advisory.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_with_spaces() {
        let json = serde_json::to_string(&RecommendationAction::StrongBuy).unwrap();
        assert_eq!(json, "\"STRONG BUY\"");
        let back: RecommendationAction = serde_json::from_str("\"STRONG SELL\"").unwrap();
        assert_eq!(back, RecommendationAction::StrongSell);
        assert!(back.is_sell() && !back.is_buy());
    }

    #[test]
    fn test_priority_action_tagging() {
        let action = PriorityAction::Portfolio(PortfolioAdvisory {
            kind: AdvisoryKind::MarketTiming,
            action: "Exercise caution".to_string(),
            priority: Priority::Medium,
            reason: "Broader market sentiment is negative".to_string(),
        });
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "portfolio");
        assert_eq!(value["kind"], "market_timing");
        assert_eq!(action.confidence(), 0.0);
        assert_eq!(action.priority().rank(), 2);
    }
}
