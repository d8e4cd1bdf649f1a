use std::sync::Arc;

use analysis_core::{IndicatorProvider, NewsProvider, ProviderChain, QuoteProvider, ResponseCache};
use analysis_orchestrator::{AnalysisOrchestrator, RecommendationReport};
use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDateTime};
use market_data::{AlphaVantageClient, FinnhubClient, MarketAuxClient};
use notification_service::NotificationService;
use portfolio_manager::valuation::{aggregate, value_position};
use portfolio_manager::{
    BenchmarkComparison, Portfolio, PortfolioStore, PortfolioValuation, PriceSource, ValuationSettings,
};
use technical_analysis::ComputedIndicatorProvider;

use crate::cli::Command;
use crate::config::TrackerConfig;
use crate::report;

pub async fn run(command: Command, config: &TrackerConfig) -> Result<()> {
    match command {
        Command::Run { dry_run } => daily_update(config, dry_run).await,
        Command::Test => system_test(config).await,
        Command::Recommend { json } => recommend(config, json).await,
        Command::Show { live } => show(config, live).await,
        edit => {
            let store = PortfolioStore::new(&config.portfolio_file);
            let mut portfolio = store.load()?;
            let summary = apply_edit(&mut portfolio, edit)?;
            store.save(&portfolio)?;
            println!("{}", summary);
            Ok(())
        }
    }
}

/// The response cache as the previous run left it.
pub fn open_cache(config: &TrackerConfig) -> Arc<ResponseCache> {
    let cache = ResponseCache::load(&config.cache_file);
    tracing::info!(
        "Response cache: {} entries from {}",
        cache.stats().valid_entries,
        config.cache_file.display()
    );
    Arc::new(cache)
}

/// A cache that cannot be written only costs API calls next run.
pub fn persist_cache(config: &TrackerConfig, cache: &ResponseCache) {
    match cache.save(&config.cache_file) {
        Ok(count) => tracing::debug!("Persisted {} cache entries", count),
        Err(e) => tracing::warn!("Failed to persist response cache: {}", e),
    }
}

/// Provider chains in fallback order, all sharing one response cache.
pub fn build_orchestrator(config: &TrackerConfig, cache: Arc<ResponseCache>) -> Result<AnalysisOrchestrator> {
    let alpha_vantage = Arc::new(AlphaVantageClient::new(config.require_alpha_vantage_key()?.to_string()));
    let finnhub = config
        .finnhub_api_key
        .clone()
        .map(|key| Arc::new(FinnhubClient::new(key)));

    let mut quotes = ProviderChain::<dyn QuoteProvider>::new("quotes").with(alpha_vantage.clone());
    if let Some(finnhub) = &finnhub {
        quotes.push(finnhub.clone());
    }

    let computed = Arc::new(ComputedIndicatorProvider::new(alpha_vantage.clone(), cache.clone()));
    let indicators = ProviderChain::<dyn IndicatorProvider>::new("indicators")
        .with(alpha_vantage.clone())
        .with(computed);

    let mut news = ProviderChain::<dyn NewsProvider>::new("news");
    if let Some(key) = &config.marketaux_api_key {
        news.push(Arc::new(MarketAuxClient::new(key.clone())));
    }
    if let Some(finnhub) = &finnhub {
        news.push(finnhub.clone());
    }
    if news.is_empty() {
        tracing::warn!("No news provider configured (set MARKETAUX_API_KEY or FINNHUB_API_KEY); sentiment will be neutral");
    }

    tracing::info!(
        "Providers: {} quote, {} indicator, {} news",
        quotes.len(),
        indicators.len(),
        news.len()
    );

    Ok(AnalysisOrchestrator::new(
        Arc::new(quotes),
        Arc::new(indicators),
        Arc::new(news),
        cache,
        config.orchestrator_settings(),
    ))
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Messages for one daily update, in send order. Without a complete report
/// the detailed performance and an error notice replace the recommendations.
pub fn daily_messages(
    valuation: &PortfolioValuation,
    report: Option<&RecommendationReport>,
    benchmark: Option<&BenchmarkComparison>,
    now: NaiveDateTime,
) -> Vec<String> {
    let complete = report.filter(|r| r.stock_recommendations.len() == valuation.stocks.len());

    let mut messages = vec![report::daily_summary(valuation, report, now)];
    match complete {
        Some(report) => messages.push(report::ai_recommendations(report, now)),
        None => {
            messages.push(report::detailed_performance(valuation, benchmark));
            let analyzed = report.map_or(0, |r| r.stock_recommendations.len());
            messages.push(report::error_message(
                "AI Analysis Incomplete",
                &format!(
                    "Recommendations generated for {} of {} positions",
                    analyzed,
                    valuation.stocks.len()
                ),
                now,
            ));
        }
    }
    if !valuation.alerts.is_empty() {
        messages.push(report::price_alerts(&valuation.alerts));
    }
    messages
}

async fn deliver(notifier: &NotificationService, messages: &[String], dry_run: bool) {
    if dry_run || notifier.is_empty() {
        for message in messages {
            println!("{}\n", message);
        }
        return;
    }

    for message in messages {
        if notifier.send(message).await == 0 {
            tracing::error!("No channel accepted the message");
        }
    }
}

async fn daily_update(config: &TrackerConfig, dry_run: bool) -> Result<()> {
    tracing::info!("Starting daily portfolio update");
    let notifier = NotificationService::new(&config.notifications);

    let portfolio = match PortfolioStore::new(&config.portfolio_file).load() {
        Ok(portfolio) => portfolio,
        Err(e) => {
            let text = report::error_message("Portfolio Loading Failed", &format!("{:#}", e), now());
            deliver(&notifier, &[text], dry_run).await;
            return Err(e);
        }
    };
    if portfolio.stocks.is_empty() {
        tracing::warn!("No stocks in portfolio");
    }

    let cache = open_cache(config);
    let orchestrator = build_orchestrator(config, cache.clone())?;
    let valuation = orchestrator.value_portfolio(&portfolio).await;
    let benchmark = orchestrator
        .compare_to_benchmark(&valuation, &portfolio.settings.benchmark)
        .await;
    let report = orchestrator.recommend_from_valuation(valuation).await;
    persist_cache(config, &cache);

    let messages = daily_messages(&report.valuation, Some(&report), benchmark.as_ref(), now());
    deliver(&notifier, &messages, dry_run).await;

    tracing::info!("Daily update complete ({} messages)", messages.len());
    Ok(())
}

async fn system_test(config: &TrackerConfig) -> Result<()> {
    let mut failures = Vec::new();

    let portfolio = match PortfolioStore::new(&config.portfolio_file).load() {
        Ok(portfolio) => {
            println!("✅ Portfolio loaded: {} positions", portfolio.stocks.len());
            Some(portfolio)
        }
        Err(e) => {
            println!("❌ Portfolio: {:#}", e);
            failures.push("portfolio");
            None
        }
    };

    let cache = open_cache(config);
    match build_orchestrator(config, cache.clone()) {
        Ok(orchestrator) => {
            let symbol = portfolio
                .as_ref()
                .and_then(|p| p.symbols().into_iter().next())
                .unwrap_or_else(|| "VOO".to_string());
            match orchestrator.valuator().resolve_quote(&symbol).await {
                Some((quote, _)) => println!("✅ Market data: {} ${:.2}", quote.symbol, quote.price),
                None => {
                    println!("❌ Market data: no quote for {}", symbol);
                    failures.push("market data");
                }
            }
            persist_cache(config, &cache);
        }
        Err(e) => {
            println!("❌ Market data: {:#}", e);
            failures.push("market data");
        }
    }

    let notifier = NotificationService::new(&config.notifications);
    if notifier.is_empty() {
        println!("⚠️  Notifications: no channels configured");
    }
    for (name, result) in notifier.check_all().await {
        match result {
            Ok(detail) => println!("✅ {}: {}", name, detail),
            Err(e) => {
                println!("❌ {}: {}", name, e);
                failures.push("notifications");
            }
        }
    }
    if !notifier.is_empty() && notifier.send(&report::test_message(now())).await == 0 {
        failures.push("notifications");
    }

    if failures.is_empty() {
        println!("\nAll checks passed");
        Ok(())
    } else {
        failures.dedup();
        bail!("System test failed: {}", failures.join(", "))
    }
}

async fn recommend(config: &TrackerConfig, json: bool) -> Result<()> {
    let portfolio = PortfolioStore::new(&config.portfolio_file).load()?;
    let cache = open_cache(config);
    let orchestrator = build_orchestrator(config, cache.clone())?;
    let report = orchestrator.generate_recommendations(&portfolio).await;
    persist_cache(config, &cache);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}\n", report::ai_recommendations(&report, now()));
    for stock in &report.stock_recommendations {
        println!(
            "{:<6} {:<12} score {:+} ({:.0}%)  {}",
            stock.symbol,
            stock.recommendation.action.as_str(),
            stock.signals.total_score,
            stock.recommendation.confidence * 100.0,
            stock.recommendation.reasoning
        );
        println!("       technical: {}", stock.technical_summary);
        println!("       news:      {}", stock.sentiment_summary);
        if let Some(reason) = &stock.recommendation.override_reason {
            println!("       held:      {}", reason);
        }
    }
    Ok(())
}

/// Value every position at its average cost; no network.
pub fn value_at_cost(portfolio: &Portfolio) -> PortfolioValuation {
    let stocks = portfolio
        .positions()
        .iter()
        .map(|p| value_position(p, None, PriceSource::CostBasis))
        .collect();
    aggregate(stocks, portfolio.cash.available, &ValuationSettings::default())
}

async fn show(config: &TrackerConfig, live: bool) -> Result<()> {
    let portfolio = PortfolioStore::new(&config.portfolio_file).load()?;
    let benchmark_symbol = &portfolio.settings.benchmark;

    if !live {
        print!("{}", report::portfolio_table(&value_at_cost(&portfolio), benchmark_symbol));
        return Ok(());
    }

    let cache = open_cache(config);
    let orchestrator = build_orchestrator(config, cache.clone())?;
    let valuation = orchestrator.value_portfolio(&portfolio).await;
    let benchmark = orchestrator.compare_to_benchmark(&valuation, benchmark_symbol).await;
    persist_cache(config, &cache);
    print!("{}", report::portfolio_table(&valuation, benchmark_symbol));
    println!("\n{}", report::detailed_performance(&valuation, benchmark.as_ref()));
    Ok(())
}

/// Apply a portfolio-editing command and describe the result.
pub fn apply_edit(portfolio: &mut Portfolio, command: Command) -> Result<String> {
    match command {
        Command::Add { symbol, shares, price, notes } => {
            let position = portfolio.add_position(&symbol, shares, price, notes)?;
            Ok(format!(
                "Added {} shares of {} at ${:.2}; now {} shares, avg ${:.2}",
                shares, position.symbol, price, position.shares, position.avg_price
            ))
        }
        Command::Update { symbol, shares, avg_price, notes } => {
            if shares.is_none() && avg_price.is_none() && notes.is_none() {
                bail!("Nothing to update for {}", symbol);
            }
            let position = portfolio.update_position(&symbol, shares, avg_price, notes)?;
            Ok(format!(
                "Updated {}: {} shares, avg ${:.2}",
                position.symbol, position.shares, position.avg_price
            ))
        }
        Command::Remove { symbol, shares: Some(shares) } => match portfolio.remove_shares(&symbol, shares)? {
            Some(position) => Ok(format!(
                "Removed {} shares of {}; {} remaining",
                shares, position.symbol, position.shares
            )),
            None => Ok(format!("Sold all shares of {}", symbol.trim().to_uppercase())),
        },
        Command::Remove { symbol, shares: None } => {
            let position = portfolio.delete_position(&symbol)?;
            Ok(format!("Removed {} ({} shares)", position.symbol, position.shares))
        }
        Command::Cash { amount } => {
            portfolio.set_cash(amount)?;
            Ok(format!("Cash set to ${:.2}", amount))
        }
        other => Err(anyhow!("{:?} does not edit the portfolio", other)),
    }
}
