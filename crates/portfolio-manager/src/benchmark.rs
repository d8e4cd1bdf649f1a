use analysis_core::{stats, Quote};

use crate::models::{BenchmarkComparison, PortfolioValuation};

/// Compare the portfolio's total return against a benchmark quote's daily move.
pub fn compare(valuation: &PortfolioValuation, benchmark_symbol: &str, quote: &Quote) -> BenchmarkComparison {
    let portfolio_return_pct = valuation.total_gain_loss_pct;
    let performance_difference = portfolio_return_pct - quote.change_percent;

    BenchmarkComparison {
        benchmark_symbol: benchmark_symbol.to_uppercase(),
        benchmark_price: quote.price,
        benchmark_change_pct: quote.change_percent,
        portfolio_return_pct: stats::round_to(portfolio_return_pct, 2),
        performance_difference: stats::round_to(performance_difference, 2),
        outperforming: performance_difference > 0.0,
    }
}
