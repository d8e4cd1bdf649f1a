//! Markdown message bodies for the notification channels and the terminal.

use analysis_core::SentimentLabel;
use analysis_orchestrator::RecommendationReport;
use chrono::NaiveDateTime;
use portfolio_manager::{
    AlertDirection, AlertSeverity, BenchmarkComparison, PortfolioValuation, PriceAlert, PriceSource,
};
use recommendation_engine::{PortfolioHealth, Priority, PriorityAction, RecommendationAction, RiskLevel};

const MAX_REPORTED_ACTIONS: usize = 4;
const MAX_REPORTED_ALERTS: usize = 5;

fn signed_money(value: f64) -> String {
    if value >= 0.0 {
        format!("+${:.2}", value)
    } else {
        format!("-${:.2}", value.abs())
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn action_emoji(action: RecommendationAction) -> &'static str {
    if action.is_buy() {
        "🟢"
    } else if action.is_sell() {
        "🔴"
    } else {
        "🟡"
    }
}

fn sentiment_emoji(label: SentimentLabel) -> &'static str {
    match label {
        SentimentLabel::Positive => "📈",
        SentimentLabel::Negative => "📉",
        SentimentLabel::Neutral => "➡️",
    }
}

pub fn daily_summary(valuation: &PortfolioValuation, report: Option<&RecommendationReport>, now: NaiveDateTime) -> String {
    let gain_emoji = if valuation.total_gain_loss >= 0.0 { "🟢" } else { "🔴" };

    let mut message = String::from("📊 *Daily Portfolio Summary*\n");
    message.push_str(&format!("📅 {}\n\n", now.format("%B %d, %Y")));
    message.push_str(&format!("💰 *Value:* ${:.2}\n", valuation.total_portfolio_value));
    message.push_str(&format!(
        "{} *P&L:* {} ({:+.1}%)\n",
        gain_emoji,
        signed_money(valuation.total_gain_loss),
        valuation.total_gain_loss_pct
    ));

    if let Some(gainer) = valuation.biggest_gainer() {
        message.push_str(&format!("🏆 *Top:* {} ({:+.1}%)\n", gainer.symbol, gainer.gain_loss_pct));
    }
    if let Some(loser) = valuation.biggest_loser() {
        message.push_str(&format!("🔻 *Bottom:* {} ({:+.1}%)\n", loser.symbol, loser.gain_loss_pct));
    }

    let Some(report) = report else {
        return message;
    };

    if let Some(PriorityAction::StockAction { symbol, action, confidence, .. }) = report.prioritized_actions.first() {
        message.push_str("\n🤖 *Top Recommendation:*\n");
        message.push_str(&format!(
            "{} {}: {} ({:.0}%)\n",
            action_emoji(*action),
            action,
            symbol,
            confidence * 100.0
        ));
    }

    let label = report.market_context.portfolio_sentiment.label;
    message.push_str(&format!(
        "\n{} *News Sentiment:* {}\n",
        sentiment_emoji(label),
        title_case(label.as_str())
    ));
    message
}

pub fn detailed_performance(valuation: &PortfolioValuation, benchmark: Option<&BenchmarkComparison>) -> String {
    let mut message = String::from("📊 *Detailed Portfolio Performance*\n\n");

    let mut stocks: Vec<_> = valuation.stocks.iter().collect();
    stocks.sort_by(|a, b| b.gain_loss_pct.total_cmp(&a.gain_loss_pct));

    for stock in stocks {
        let gain_emoji = if stock.gain_loss_pct >= 0.0 { "🟢" } else { "🔴" };
        message.push_str(&format!("{} *{}:* ${:.2}", gain_emoji, stock.symbol, stock.current_price));
        if stock.price_source == PriceSource::CostBasis {
            message.push_str(" (no quote)");
        }
        message.push('\n');
        message.push_str(&format!(
            "   Position: {:+.1}% ({})\n",
            stock.gain_loss_pct,
            signed_money(stock.gain_loss)
        ));
        if let Some(daily) = stock.price_change_pct.filter(|d| *d != 0.0) {
            let daily_emoji = if daily > 0.0 { "📈" } else { "📉" };
            message.push_str(&format!("   {} Today: {:+.1}%\n", daily_emoji, daily));
        }
        message.push('\n');
    }

    if valuation.cash > 0.0 {
        message.push_str(&format!("💵 *Cash:* ${:.2}\n\n", valuation.cash));
    }

    message.push_str("📈 *Summary:*\n");
    message.push_str(&format!("Invested: ${:.2}\n", valuation.total_invested));
    message.push_str(&format!("Current: ${:.2}\n", valuation.current_value));
    message.push_str(&format!(
        "Gain/Loss: {} ({:+.1}%)\n",
        signed_money(valuation.total_gain_loss),
        valuation.total_gain_loss_pct
    ));

    if let Some(cmp) = benchmark {
        let verdict = if cmp.outperforming { "ahead of" } else { "behind" };
        message.push_str(&format!(
            "\n📊 *Benchmark {}:* {:+.2}% today, portfolio {:+.2}% ({} by {:.2} pts)\n",
            cmp.benchmark_symbol,
            cmp.benchmark_change_pct,
            cmp.portfolio_return_pct,
            verdict,
            cmp.performance_difference.abs()
        ));
    }
    message
}

pub fn ai_recommendations(report: &RecommendationReport, now: NaiveDateTime) -> String {
    let mut message = String::from("🤖 *AI Investment Analysis*\n\n");

    if !report.prioritized_actions.is_empty() {
        message.push_str("🎯 *Recommended Actions:*\n");
        for action in report.prioritized_actions.iter().take(MAX_REPORTED_ACTIONS) {
            let priority_emoji = match action.priority() {
                Priority::High => "🔥",
                Priority::Medium => "⚠️",
                Priority::Low => "💡",
            };
            match action {
                PriorityAction::StockAction { symbol, action, reasoning, confidence, .. } => {
                    message.push_str(&format!(
                        "{} {} *{}: {}*\n   {}\n   Confidence: {:.0}%\n\n",
                        priority_emoji,
                        action_emoji(*action),
                        action,
                        symbol,
                        reasoning,
                        confidence * 100.0
                    ));
                }
                PriorityAction::Portfolio(advisory) => {
                    message.push_str(&format!("{} {}\n   {}\n\n", priority_emoji, advisory.action, advisory.reason));
                }
            }
        }
    }

    let portfolio = &report.portfolio_recommendations;
    let (health_emoji, health) = match portfolio.portfolio_health {
        PortfolioHealth::Excellent => ("🎉", "Excellent"),
        PortfolioHealth::Good => ("✅", "Good"),
        PortfolioHealth::Fair => ("⚠️", "Fair"),
        PortfolioHealth::Poor => ("❌", "Poor"),
    };
    let (risk_emoji, risk) = match portfolio.risk_level {
        RiskLevel::Low => ("🟢", "Low"),
        RiskLevel::Medium => ("🟡", "Medium"),
        RiskLevel::High => ("🔴", "High"),
    };
    message.push_str("📊 *Portfolio Assessment:*\n");
    message.push_str(&format!("Health: {} {}\n", health_emoji, health));
    message.push_str(&format!("Risk: {} {}\n\n", risk_emoji, risk));

    let context = &report.market_context;
    let label = context.portfolio_sentiment.label;
    message.push_str(&format!(
        "{} *News Sentiment:* {}\n",
        sentiment_emoji(label),
        title_case(label.as_str())
    ));
    let market_emoji = match context.market_sentiment.label {
        SentimentLabel::Positive => "🌟",
        SentimentLabel::Negative => "⛈️",
        SentimentLabel::Neutral => "☁️",
    };
    message.push_str(&format!(
        "{} *Market Mood:* {}\n",
        market_emoji,
        title_case(context.market_sentiment.label.as_str())
    ));

    message.push_str(&format!("\n🕐 {}", now.format("%H:%M")));
    message
}

/// The largest moves first.
pub fn price_alerts(alerts: &[PriceAlert]) -> String {
    if alerts.is_empty() {
        return "✅ *No Price Alerts*\nAll positions within normal ranges".to_string();
    }

    let mut sorted: Vec<&PriceAlert> = alerts.iter().collect();
    sorted.sort_by(|a, b| b.change_pct.abs().total_cmp(&a.change_pct.abs()));

    let mut message = String::from("🚨 *Price Movement Alerts*\n\n");
    for alert in sorted.into_iter().take(MAX_REPORTED_ALERTS) {
        let (emoji, kind, color) = match alert.direction {
            AlertDirection::Gain => ("📈", "GAIN", "🟢"),
            AlertDirection::Loss => ("📉", "LOSS", "🔴"),
        };
        let severity = match alert.severity {
            AlertSeverity::High => "🔥",
            AlertSeverity::Medium => "⚠️",
        };
        message.push_str(&format!("{} {} *{} - {}*\n", color, severity, alert.symbol, kind));
        message.push_str(&format!("{} Change: {:+.1}%\n", emoji, alert.change_pct));
        message.push_str(&format!("💰 Price: ${:.2}\n", alert.current_price));
        message.push_str(&format!("📊 Position Value: ${:.2}\n\n", alert.position_value));
    }
    message
}

pub fn error_message(kind: &str, details: &str, now: NaiveDateTime) -> String {
    format!(
        "⚠️ *Portfolio Tracker Alert*\n\n❌ *Error Type:* {}\n📝 *Details:* {}\n\n🕐 {}\n\n💡 The daily update may be delayed. Manual check recommended.",
        kind,
        details,
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn test_message(now: NaiveDateTime) -> String {
    format!(
        "🧪 *Portfolio Tracker Test*\n\n✅ Notification channel working\n📊 Portfolio analysis ready\n🤖 Recommendations active\n🚨 Price alerts enabled\n\n🕐 {}",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Plain-text holdings table for the terminal.
pub fn portfolio_table(valuation: &PortfolioValuation, benchmark_symbol: &str) -> String {
    if valuation.stocks.is_empty() {
        return format!("Portfolio is empty. Cash: ${:.2}\n", valuation.cash);
    }

    let rule = "=".repeat(80);
    let mut out = format!(
        "{}\n{:<8} {:>10} {:>10} {:>10} {:>12} {:>12} {:>9}\n{}\n",
        rule, "Symbol", "Shares", "Avg", "Price", "Invested", "Value", "Return", rule
    );
    for stock in &valuation.stocks {
        out.push_str(&format!(
            "{:<8} {:>10.4} {:>10.2} {:>10.2} {:>12.2} {:>12.2} {:>8.1}%\n",
            stock.symbol,
            stock.shares,
            stock.avg_price,
            stock.current_price,
            stock.total_invested,
            stock.current_value,
            stock.gain_loss_pct
        ));
    }
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("Total Invested:  ${:.2}\n", valuation.total_invested));
    out.push_str(&format!("Current Value:   ${:.2}\n", valuation.current_value));
    out.push_str(&format!("Available Cash:  ${:.2}\n", valuation.cash));
    out.push_str(&format!("Total Portfolio: ${:.2}\n", valuation.total_portfolio_value));
    out.push_str(&format!(
        "Total Gain/Loss: {} ({:+.1}%)\n",
        signed_money(valuation.total_gain_loss),
        valuation.total_gain_loss_pct
    ));
    out.push_str(&format!("Benchmark:       {}\n", benchmark_symbol));
    out
}
