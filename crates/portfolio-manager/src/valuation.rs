use analysis_core::{Quote, QuoteProvider, ResponseCache};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::models::*;

#[derive(Debug, Clone)]
pub struct ValuationSettings {
    /// Absolute daily move, in percent, that raises a price alert.
    pub alert_threshold_pct: f64,
    /// Moves at or beyond this are high severity.
    pub high_severity_pct: f64,
    pub quote_ttl: Duration,
    /// How long a quote stays usable as a last-known fallback.
    pub last_known_ttl: Duration,
}

impl Default for ValuationSettings {
    fn default() -> Self {
        Self {
            alert_threshold_pct: 5.0,
            high_severity_pct: 10.0,
            quote_ttl: Duration::from_secs(300),
            last_known_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Value a single position. Without a quote the position is priced at its
/// average cost and carries no daily-change data.
pub fn value_position(position: &Position, quote: Option<&Quote>, source: PriceSource) -> ValuationResult {
    let (current_price, source) = match quote {
        Some(q) if q.price > 0.0 => (q.price, source),
        _ => (position.avg_price, PriceSource::CostBasis),
    };
    let quote = quote.filter(|_| source != PriceSource::CostBasis);

    let current_value = position.shares * current_price;
    let gain_loss = current_value - position.total_invested;
    let gain_loss_pct = if position.total_invested > 0.0 {
        gain_loss / position.total_invested * 100.0
    } else {
        0.0
    };

    ValuationResult {
        symbol: position.symbol.clone(),
        shares: position.shares,
        avg_price: position.avg_price,
        current_price,
        total_invested: position.total_invested,
        current_value,
        gain_loss,
        gain_loss_pct,
        price_change: quote.map(|q| q.change),
        price_change_pct: quote.map(|q| q.change_percent),
        volume: quote.and_then(|q| q.volume),
        high: quote.and_then(|q| q.high),
        low: quote.and_then(|q| q.low),
        previous_close: quote.and_then(|q| q.previous_close.or(Some(q.price - q.change))),
        price_source: source,
    }
}

/// Alert when the absolute daily move reaches `threshold_pct`.
pub fn price_alert(result: &ValuationResult, settings: &ValuationSettings) -> Option<PriceAlert> {
    let change_pct = result.price_change_pct?;
    if change_pct.abs() < settings.alert_threshold_pct {
        return None;
    }

    Some(PriceAlert {
        symbol: result.symbol.clone(),
        change_pct,
        change_amount: result.price_change,
        current_price: result.current_price,
        previous_close: result.previous_close,
        threshold: settings.alert_threshold_pct,
        direction: if change_pct > 0.0 { AlertDirection::Gain } else { AlertDirection::Loss },
        severity: if change_pct.abs() >= settings.high_severity_pct {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        },
        position_value: result.current_value,
    })
}

/// Fold per-position results into portfolio totals.
pub fn aggregate(stocks: Vec<ValuationResult>, cash: f64, settings: &ValuationSettings) -> PortfolioValuation {
    let total_invested: f64 = stocks.iter().map(|s| s.total_invested).sum();
    let current_value: f64 = stocks.iter().map(|s| s.current_value).sum();
    let total_gain_loss = current_value - total_invested;
    let total_gain_loss_pct = if total_invested > 0.0 {
        total_gain_loss / total_invested * 100.0
    } else {
        0.0
    };
    let alerts = stocks.iter().filter_map(|s| price_alert(s, settings)).collect();

    PortfolioValuation {
        stocks,
        total_invested,
        current_value,
        total_gain_loss,
        total_gain_loss_pct,
        cash,
        total_portfolio_value: current_value + cash,
        alerts,
        last_updated: Utc::now(),
    }
}

/// Prices positions through a quote provider chain with cache in front and
/// a last-known quote behind it.
pub struct PortfolioValuator {
    quotes: Arc<dyn QuoteProvider>,
    cache: Arc<ResponseCache>,
    settings: ValuationSettings,
}

impl PortfolioValuator {
    pub fn new(quotes: Arc<dyn QuoteProvider>, cache: Arc<ResponseCache>, settings: ValuationSettings) -> Self {
        Self { quotes, cache, settings }
    }

    pub fn settings(&self) -> &ValuationSettings {
        &self.settings
    }

    /// Fresh cache, then providers in order, then the last-known quote.
    pub async fn resolve_quote(&self, symbol: &str) -> Option<(Quote, PriceSource)> {
        let fresh_key = format!("quote:{}", symbol);
        let last_key = format!("quote:last:{}", symbol);

        if let Some(quote) = self.cache.get::<Quote>(&fresh_key) {
            return Some((quote, PriceSource::Cached));
        }

        match self.quotes.get_quote(symbol).await {
            Ok(Some(quote)) => {
                self.cache.set(&fresh_key, &quote, self.settings.quote_ttl);
                self.cache.set(&last_key, &quote, self.settings.last_known_ttl);
                return Some((quote, PriceSource::Live));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Quote lookup failed for {}: {}", symbol, e),
        }

        if let Some(quote) = self.cache.get::<Quote>(&last_key) {
            tracing::warn!("Using last known quote for {}", symbol);
            return Some((quote, PriceSource::LastKnown));
        }

        tracing::warn!("Could not get current price for {}, using average price", symbol);
        None
    }

    pub async fn value_position(&self, position: &Position) -> ValuationResult {
        let resolved = self.resolve_quote(&position.symbol).await;
        let (quote, source) = match &resolved {
            Some((q, s)) => (Some(q), *s),
            None => (None, PriceSource::CostBasis),
        };
        value_position(position, quote, source)
    }

    /// Value every position sequentially and total the portfolio.
    pub async fn value_positions(&self, positions: &[Position], cash: f64) -> PortfolioValuation {
        tracing::info!("Analyzing portfolio with {} stocks", positions.len());

        let mut stocks = Vec::with_capacity(positions.len());
        for position in positions {
            stocks.push(self.value_position(position).await);
        }

        let valuation = aggregate(stocks, cash, &self.settings);
        for alert in &valuation.alerts {
            tracing::info!("Price alert: {} {:+.2}%", alert.symbol, alert.change_pct);
        }
        tracing::info!(
            "Portfolio analysis complete - Total value: ${:.2}",
            valuation.total_portfolio_value
        );
        valuation
    }

    pub async fn value_portfolio(&self, portfolio: &Portfolio) -> PortfolioValuation {
        self.value_positions(&portfolio.positions(), portfolio.cash.available).await
    }

    /// Compare the portfolio's total return to the benchmark's daily move.
    /// `None` when no quote is available for the benchmark.
    pub async fn compare_to_benchmark(
        &self,
        valuation: &PortfolioValuation,
        benchmark_symbol: &str,
    ) -> Option<BenchmarkComparison> {
        let (quote, _) = self.resolve_quote(benchmark_symbol).await?;
        Some(crate::benchmark::compare(valuation, benchmark_symbol, &quote))
    }
}
