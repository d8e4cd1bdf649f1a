use async_trait::async_trait;
use crate::{AnalysisError, Bar, IndicatorRequest, IndicatorSeries, NewsArticle, Quote};

/// Source of latest quotes. `Ok(None)` means the provider has no data for the symbol.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, AnalysisError>;

    fn name(&self) -> &str;
}

/// Source of precomputed indicator series
#[async_trait]
pub trait IndicatorProvider: Send + Sync {
    async fn get_technical_indicator(
        &self,
        symbol: &str,
        request: IndicatorRequest,
    ) -> Result<Option<IndicatorSeries>, AnalysisError>;

    fn name(&self) -> &str;
}

/// Source of daily price history, oldest bar first
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn get_daily_bars(&self, symbol: &str) -> Result<Option<Vec<Bar>>, AnalysisError>;

    fn name(&self) -> &str;
}

/// Source of news. `symbol = None` requests general market news.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn get_news(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError>;

    fn name(&self) -> &str;
}
