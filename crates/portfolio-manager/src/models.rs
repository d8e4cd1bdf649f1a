use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A held quantity of one symbol. `total_invested` is authoritative and may
/// differ from `shares * avg_price` (fees, manual edits).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Filled from the map key when a portfolio is loaded.
    #[serde(skip)]
    pub symbol: String,
    pub shares: f64,
    pub avg_price: f64,
    pub total_invested: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Position {
    pub fn new(symbol: &str, shares: f64, avg_price: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            shares,
            avg_price,
            total_invested: shares * avg_price,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashBalance {
    #[serde(default)]
    pub available: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for CashBalance {
    fn default() -> Self {
        Self {
            available: 0.0,
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSettings {
    #[serde(default = "default_benchmark")]
    pub benchmark: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            benchmark: default_benchmark(),
            currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_benchmark() -> String {
    "VOO".to_string()
}

/// Holdings plus cash, in the on-disk JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    pub stocks: BTreeMap<String, Position>,
    #[serde(default)]
    pub cash: CashBalance,
    #[serde(default)]
    pub settings: PortfolioSettings,
}

/// Where a valuation's current price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Live,
    Cached,
    LastKnown,
    /// No quote anywhere; priced at average cost.
    CostBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    pub symbol: String,
    pub shares: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub total_invested: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub gain_loss_pct: f64,
    pub price_change: Option<f64>,
    pub price_change_pct: Option<f64>,
    pub volume: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub previous_close: Option<f64>,
    pub price_source: PriceSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Gain,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    High,
    Medium,
}

/// A daily move at or beyond the alert threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    pub symbol: String,
    pub change_pct: f64,
    pub change_amount: Option<f64>,
    pub current_price: f64,
    pub previous_close: Option<f64>,
    pub threshold: f64,
    pub direction: AlertDirection,
    pub severity: AlertSeverity,
    pub position_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub stocks: Vec<ValuationResult>,
    pub total_invested: f64,
    pub current_value: f64,
    pub total_gain_loss: f64,
    pub total_gain_loss_pct: f64,
    pub cash: f64,
    pub total_portfolio_value: f64,
    pub alerts: Vec<PriceAlert>,
    pub last_updated: DateTime<Utc>,
}

/// Symbol and return of the best or worst performer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mover {
    pub symbol: String,
    pub gain_loss_pct: f64,
}

impl PortfolioValuation {
    pub fn position(&self, symbol: &str) -> Option<&ValuationResult> {
        self.stocks.iter().find(|s| s.symbol == symbol)
    }

    /// Fraction (0..1) of total portfolio value, cash included, held in `symbol`.
    pub fn weight_of(&self, symbol: &str) -> f64 {
        if self.total_portfolio_value <= 0.0 {
            return 0.0;
        }
        self.position(symbol)
            .map(|p| p.current_value / self.total_portfolio_value)
            .unwrap_or(0.0)
    }

    /// Cash as a percentage of total portfolio value.
    pub fn cash_pct(&self) -> f64 {
        if self.total_portfolio_value <= 0.0 {
            return 0.0;
        }
        self.cash / self.total_portfolio_value * 100.0
    }

    pub fn biggest_gainer(&self) -> Option<Mover> {
        self.stocks
            .iter()
            .filter(|s| s.gain_loss_pct > 0.0)
            .max_by(|a, b| a.gain_loss_pct.total_cmp(&b.gain_loss_pct))
            .map(|s| Mover {
                symbol: s.symbol.clone(),
                gain_loss_pct: s.gain_loss_pct,
            })
    }

    pub fn biggest_loser(&self) -> Option<Mover> {
        self.stocks
            .iter()
            .filter(|s| s.gain_loss_pct < 0.0)
            .min_by(|a, b| a.gain_loss_pct.total_cmp(&b.gain_loss_pct))
            .map(|s| Mover {
                symbol: s.symbol.clone(),
                gain_loss_pct: s.gain_loss_pct,
            })
    }
}

/// Portfolio return against one benchmark's daily move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub benchmark_symbol: String,
    pub benchmark_price: f64,
    pub benchmark_change_pct: f64,
    pub portfolio_return_pct: f64,
    pub performance_difference: f64,
    pub outperforming: bool,
}
