use analysis_core::{
    IndicatorProvider, IndicatorRequest, IndicatorSeries, IndicatorValue, OverallTechnicalSignal,
    ResponseCache, TechnicalSignal,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::signals::*;

const RSI_HISTORY_LEN: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsiAnalysis {
    pub symbol: String,
    pub period: usize,
    pub current_rsi: f64,
    pub signal: TechnicalSignal,
    pub trend: Trend,
    /// Most recent readings, newest first.
    pub historical_values: Vec<f64>,
    pub last_updated: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacdAnalysis {
    pub symbol: String,
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
    pub signal: TechnicalSignal,
    pub last_updated: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmaAnalysis {
    pub symbol: String,
    pub short_period: usize,
    pub long_period: usize,
    pub short_sma: f64,
    pub long_sma: f64,
    pub signal: TechnicalSignal,
    pub last_updated: NaiveDate,
}

/// Everything the technical side knows about one symbol. Indicators that could
/// not be obtained are `None` and are left out of the overall signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub symbol: String,
    pub rsi: Option<RsiAnalysis>,
    pub macd: Option<MacdAnalysis>,
    pub sma: Option<SmaAnalysis>,
    pub overall_signal: OverallTechnicalSignal,
    pub signal_strength: f64,
    pub analyzed_at: DateTime<Utc>,
}

impl TechnicalAnalysis {
    pub fn from_parts(
        symbol: &str,
        rsi: Option<RsiAnalysis>,
        macd: Option<MacdAnalysis>,
        sma: Option<SmaAnalysis>,
    ) -> Self {
        let signals: Vec<&TechnicalSignal> = [
            rsi.as_ref().map(|a| &a.signal),
            macd.as_ref().map(|a| &a.signal),
            sma.as_ref().map(|a| &a.signal),
        ]
        .into_iter()
        .flatten()
        .collect();

        let overall_signal = overall_signal(&signals);
        let signal_strength = signal_strength(&signals);

        Self {
            symbol: symbol.to_string(),
            rsi,
            macd,
            sma,
            overall_signal,
            signal_strength,
            analyzed_at: Utc::now(),
        }
    }

    pub fn indicator_count(&self) -> usize {
        [self.rsi.is_some(), self.macd.is_some(), self.sma.is_some()]
            .iter()
            .filter(|present| **present)
            .count()
    }
}

/// Fetches indicator series through the provider chain and scores them.
/// Each per-indicator analysis is cached independently.
pub struct TechnicalAnalysisEngine {
    indicators: Arc<dyn IndicatorProvider>,
    cache: Arc<ResponseCache>,
    settings: TechnicalSettings,
}

impl TechnicalAnalysisEngine {
    pub fn new(indicators: Arc<dyn IndicatorProvider>, cache: Arc<ResponseCache>, settings: TechnicalSettings) -> Self {
        Self {
            indicators,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &TechnicalSettings {
        &self.settings
    }

    async fn fetch_series(&self, symbol: &str, request: IndicatorRequest) -> Option<IndicatorSeries> {
        match self.indicators.get_technical_indicator(symbol, request).await {
            Ok(Some(series)) if !series.is_empty() => Some(series),
            Ok(_) => {
                tracing::warn!("No {} data available for {}", request.function_name(), symbol);
                None
            }
            Err(e) => {
                tracing::warn!("{} fetch failed for {}: {}", request.function_name(), symbol, e);
                None
            }
        }
    }

    pub async fn rsi_analysis(&self, symbol: &str) -> Option<RsiAnalysis> {
        let period = self.settings.rsi_period;
        let cache_key = format!("rsi:{}:{}", symbol, period);
        if let Some(cached) = self.cache.get::<RsiAnalysis>(&cache_key) {
            return Some(cached);
        }

        let series = self.fetch_series(symbol, IndicatorRequest::rsi(period)).await?;
        let (last_updated, latest) = series.values.iter().next_back()?;
        let current_rsi = latest.as_single()?;

        let historical_values: Vec<f64> = series
            .recent(RSI_HISTORY_LEN)
            .iter()
            .filter_map(IndicatorValue::as_single)
            .collect();

        let analysis = RsiAnalysis {
            symbol: symbol.to_string(),
            period,
            current_rsi,
            signal: rsi_signal(current_rsi, &self.settings),
            trend: rsi_trend(&historical_values),
            historical_values,
            last_updated: *last_updated,
        };

        self.cache.set(&cache_key, &analysis, self.settings.cache_ttl);
        Some(analysis)
    }

    pub async fn macd_analysis(&self, symbol: &str) -> Option<MacdAnalysis> {
        let cache_key = format!("macd:{}", symbol);
        if let Some(cached) = self.cache.get::<MacdAnalysis>(&cache_key) {
            return Some(cached);
        }

        let series = self.fetch_series(symbol, IndicatorRequest::macd_default()).await?;
        let (last_updated, latest) = series.values.iter().next_back()?;
        let IndicatorValue::Macd { macd, signal, histogram } = *latest else {
            tracing::warn!("MACD series for {} has no signal line", symbol);
            return None;
        };

        let analysis = MacdAnalysis {
            symbol: symbol.to_string(),
            macd_line: macd,
            signal_line: signal,
            histogram,
            signal: macd_signal(macd, signal, histogram),
            last_updated: *last_updated,
        };

        self.cache.set(&cache_key, &analysis, self.settings.cache_ttl);
        Some(analysis)
    }

    pub async fn sma_analysis(&self, symbol: &str) -> Option<SmaAnalysis> {
        let (short_period, long_period) = (self.settings.sma_short, self.settings.sma_long);
        let cache_key = format!("sma:{}:{}:{}", symbol, short_period, long_period);
        if let Some(cached) = self.cache.get::<SmaAnalysis>(&cache_key) {
            return Some(cached);
        }

        let short = self.fetch_series(symbol, IndicatorRequest::sma(short_period)).await?;
        let long = self.fetch_series(symbol, IndicatorRequest::sma(long_period)).await?;
        let short_sma = short.latest()?.as_single()?;
        let long_sma = long.latest()?.as_single()?;
        let last_updated = *short.values.keys().next_back()?;

        let analysis = SmaAnalysis {
            symbol: symbol.to_string(),
            short_period,
            long_period,
            short_sma,
            long_sma,
            signal: sma_signal(short_sma, long_sma, self.settings.sma_strong_gap),
            last_updated,
        };

        self.cache.set(&cache_key, &analysis, self.settings.cache_ttl);
        Some(analysis)
    }

    /// Run every indicator analysis for `symbol`. Never fails: missing
    /// indicators just lower the confidence of the overall signal.
    pub async fn analyze(&self, symbol: &str) -> TechnicalAnalysis {
        let rsi = self.rsi_analysis(symbol).await;
        let macd = self.macd_analysis(symbol).await;
        let sma = self.sma_analysis(symbol).await;

        let analysis = TechnicalAnalysis::from_parts(symbol, rsi, macd, sma);
        tracing::info!(
            "Technical analysis for {}: {:?} ({:?}, {} indicators)",
            symbol,
            analysis.overall_signal.action,
            analysis.overall_signal.strength,
            analysis.indicator_count()
        );
        analysis
    }
}
