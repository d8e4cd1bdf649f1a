//! Ordered fallback over several providers of the same kind.
//!
//! A chain tries each provider in turn and stops at the first one that yields
//! data. Errors (including throttling) are logged and treated as "try the next".

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    AnalysisError, Bar, IndicatorProvider, IndicatorRequest, IndicatorSeries, NewsArticle,
    NewsProvider, PriceHistoryProvider, Quote, QuoteProvider,
};

pub struct ProviderChain<P: ?Sized> {
    name: String,
    providers: Vec<Arc<P>>,
}

impl<P: ?Sized> ProviderChain<P> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            providers: Vec::new(),
        }
    }

    pub fn with(mut self, provider: Arc<P>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn push(&mut self, provider: Arc<P>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn log_failure(chain: &str, provider: &str, symbol: &str, err: &AnalysisError) {
    if err.is_rate_limited() {
        tracing::warn!("[{}] {} throttled for {}: {}", chain, provider, symbol, err);
    } else {
        tracing::warn!("[{}] {} failed for {}: {}", chain, provider, symbol, err);
    }
}

#[async_trait]
impl QuoteProvider for ProviderChain<dyn QuoteProvider> {
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, AnalysisError> {
        for provider in &self.providers {
            match provider.get_quote(symbol).await {
                Ok(Some(quote)) => return Ok(Some(quote)),
                Ok(None) => tracing::debug!("[{}] {} has no quote for {}", self.name, provider.name(), symbol),
                Err(e) => log_failure(&self.name, provider.name(), symbol, &e),
            }
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl IndicatorProvider for ProviderChain<dyn IndicatorProvider> {
    async fn get_technical_indicator(
        &self,
        symbol: &str,
        request: IndicatorRequest,
    ) -> Result<Option<IndicatorSeries>, AnalysisError> {
        for provider in &self.providers {
            match provider.get_technical_indicator(symbol, request).await {
                Ok(Some(series)) if !series.is_empty() => return Ok(Some(series)),
                Ok(_) => tracing::debug!(
                    "[{}] {} has no {} series for {}",
                    self.name,
                    provider.name(),
                    request.function_name(),
                    symbol
                ),
                Err(e) => log_failure(&self.name, provider.name(), symbol, &e),
            }
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl PriceHistoryProvider for ProviderChain<dyn PriceHistoryProvider> {
    async fn get_daily_bars(&self, symbol: &str) -> Result<Option<Vec<Bar>>, AnalysisError> {
        for provider in &self.providers {
            match provider.get_daily_bars(symbol).await {
                Ok(Some(bars)) if !bars.is_empty() => return Ok(Some(bars)),
                Ok(_) => tracing::debug!("[{}] {} has no bars for {}", self.name, provider.name(), symbol),
                Err(e) => log_failure(&self.name, provider.name(), symbol, &e),
            }
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl NewsProvider for ProviderChain<dyn NewsProvider> {
    async fn get_news(&self, symbol: Option<&str>, limit: usize) -> Result<Vec<NewsArticle>, AnalysisError> {
        let subject = symbol.unwrap_or("market");
        for provider in &self.providers {
            match provider.get_news(symbol, limit).await {
                Ok(articles) if !articles.is_empty() => return Ok(articles),
                Ok(_) => tracing::debug!("[{}] {} has no news for {}", self.name, provider.name(), subject),
                Err(e) => log_failure(&self.name, provider.name(), subject, &e),
            }
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Price(f64),
        Empty,
        Throttled,
        Fails,
    }

    struct FakeQuotes {
        label: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeQuotes {
        fn new(label: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                label,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QuoteProvider for FakeQuotes {
        async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Price(price) => Ok(Some(Quote {
                    symbol: symbol.to_string(),
                    price,
                    change: 0.0,
                    change_percent: 0.0,
                    volume: None,
                    high: None,
                    low: None,
                    open: None,
                    previous_close: None,
                })),
                Behaviour::Empty => Ok(None),
                Behaviour::Throttled => Err(AnalysisError::RateLimited("slow down".to_string())),
                Behaviour::Fails => Err(AnalysisError::ApiError("boom".to_string())),
            }
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let primary = FakeQuotes::new("primary", Behaviour::Price(10.0));
        let secondary = FakeQuotes::new("secondary", Behaviour::Price(20.0));
        let chain = ProviderChain::<dyn QuoteProvider>::new("quotes")
            .with(primary.clone())
            .with(secondary.clone());

        let quote = chain.get_quote("AAPL").await.unwrap().unwrap();
        assert_eq!(quote.price, 10.0);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failures_fall_through() {
        let throttled = FakeQuotes::new("throttled", Behaviour::Throttled);
        let broken = FakeQuotes::new("broken", Behaviour::Fails);
        let empty = FakeQuotes::new("empty", Behaviour::Empty);
        let last = FakeQuotes::new("last", Behaviour::Price(99.0));
        let chain = ProviderChain::<dyn QuoteProvider>::new("quotes")
            .with(throttled)
            .with(broken)
            .with(empty.clone())
            .with(last);

        let quote = chain.get_quote("AAPL").await.unwrap().unwrap();
        assert_eq!(quote.price, 99.0);
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_absence_not_error() {
        let chain = ProviderChain::<dyn QuoteProvider>::new("quotes")
            .with(FakeQuotes::new("a", Behaviour::Fails))
            .with(FakeQuotes::new("b", Behaviour::Throttled));

        assert!(chain.get_quote("AAPL").await.unwrap().is_none());

        let empty = ProviderChain::<dyn QuoteProvider>::new("none");
        assert!(empty.is_empty());
        assert!(empty.get_quote("AAPL").await.unwrap().is_none());
    }
}
