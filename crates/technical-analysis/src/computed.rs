use analysis_core::{
    AnalysisError, Bar, IndicatorProvider, IndicatorRequest, IndicatorSeries, IndicatorValue,
    PriceHistoryProvider, ResponseCache,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::indicators::{macd, rsi, sma};

const BARS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Derives indicator series locally from daily closes. Used as a fallback
/// behind a remote indicator endpoint.
pub struct ComputedIndicatorProvider {
    history: Arc<dyn PriceHistoryProvider>,
    cache: Arc<ResponseCache>,
}

impl ComputedIndicatorProvider {
    pub fn new(history: Arc<dyn PriceHistoryProvider>, cache: Arc<ResponseCache>) -> Self {
        Self { history, cache }
    }

    async fn bars(&self, symbol: &str) -> Result<Option<Vec<Bar>>, AnalysisError> {
        let cache_key = format!("bars:{}", symbol);
        if let Some(bars) = self.cache.get::<Vec<Bar>>(&cache_key) {
            return Ok(Some(bars));
        }

        let bars = self.history.get_daily_bars(symbol).await?;
        if let Some(ref bars) = bars {
            self.cache.set(&cache_key, bars, BARS_CACHE_TTL);
        }
        Ok(bars)
    }
}

/// Compute the requested series from bars (oldest first), keyed by bar date.
pub fn compute_series(bars: &[Bar], request: IndicatorRequest) -> Option<IndicatorSeries> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let values: Vec<IndicatorValue> = match request {
        IndicatorRequest::Rsi { period } => rsi(&closes, period).into_iter().map(IndicatorValue::Single).collect(),
        IndicatorRequest::Sma { period } => sma(&closes, period).into_iter().map(IndicatorValue::Single).collect(),
        IndicatorRequest::Macd { fast, slow, signal } => {
            let result = macd(&closes, fast, slow, signal);
            let offset = result.macd_line.len() - result.signal_line.len();
            result
                .signal_line
                .iter()
                .zip(&result.histogram)
                .enumerate()
                .map(|(i, (signal, histogram))| IndicatorValue::Macd {
                    macd: result.macd_line[i + offset],
                    signal: *signal,
                    histogram: *histogram,
                })
                .collect()
        }
    };

    if values.is_empty() {
        return None;
    }

    // end-aligned: the last value belongs to the last bar
    let skip = bars.len() - values.len();
    let mut series = IndicatorSeries::new(request);
    for (bar, value) in bars[skip..].iter().zip(values) {
        series.values.insert(bar.date, value);
    }
    Some(series)
}

#[async_trait]
impl IndicatorProvider for ComputedIndicatorProvider {
    async fn get_technical_indicator(
        &self,
        symbol: &str,
        request: IndicatorRequest,
    ) -> Result<Option<IndicatorSeries>, AnalysisError> {
        let Some(bars) = self.bars(symbol).await? else {
            return Ok(None);
        };
        let series = compute_series(&bars, request);
        if series.is_none() {
            tracing::debug!(
                "Not enough history ({} bars) to compute {} for {}",
                bars.len(),
                request.function_name(),
                symbol
            );
        }
        Ok(series)
    }

    fn name(&self) -> &str {
        "computed"
    }
}
