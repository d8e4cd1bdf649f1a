use analysis_core::{
    AnalysisError, Bar, IndicatorProvider, IndicatorRequest, IndicatorSeries, IndicatorValue,
    PriceHistoryProvider, Quote, QuoteProvider,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::{build_http_client, fetch_json, value_as_f64, RateLimiter};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage client: quotes, daily history and server-side technical indicators.
/// Free tier allows 5 requests per minute.
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> Self {
        Self::with_rate_limit(api_key, 5)
    }

    pub fn with_rate_limit(api_key: String, requests_per_minute: usize) -> Self {
        Self {
            api_key,
            client: build_http_client(),
            rate_limiter: RateLimiter::new(PROVIDER, requests_per_minute, Duration::from_secs(60)),
        }
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<Value, AnalysisError> {
        let builder = self
            .client
            .get(BASE_URL)
            .query(params)
            .query(&[("apikey", &self.api_key)]);
        let body = fetch_json(PROVIDER, &self.rate_limiter, builder).await?;
        check_api_messages(&body)?;
        Ok(body)
    }
}

/// Alpha Vantage reports errors and throttling with HTTP 200 and a message field.
pub fn check_api_messages(body: &Value) -> Result<(), AnalysisError> {
    if let Some(msg) = body.get("Error Message").and_then(Value::as_str) {
        return Err(AnalysisError::ApiError(format!("{}: {}", PROVIDER, msg)));
    }
    for key in ["Note", "Information"] {
        if let Some(msg) = body.get(key).and_then(Value::as_str) {
            return Err(AnalysisError::RateLimited(format!("{}: {}", PROVIDER, msg)));
        }
    }
    Ok(())
}

/// Parse a `GLOBAL_QUOTE` response. An empty quote object means the symbol is unknown.
pub fn parse_global_quote(symbol: &str, body: &Value) -> Result<Option<Quote>, AnalysisError> {
    let Some(quote) = body.get("Global Quote").and_then(Value::as_object) else {
        return Ok(None);
    };
    if quote.is_empty() {
        return Ok(None);
    }

    let price = value_as_f64(quote.get("05. price"))
        .ok_or_else(|| AnalysisError::ParseError(format!("{}: quote for {} has no price", PROVIDER, symbol)))?;

    Ok(Some(Quote {
        symbol: quote
            .get("01. symbol")
            .and_then(Value::as_str)
            .unwrap_or(symbol)
            .to_string(),
        price,
        change: value_as_f64(quote.get("09. change")).unwrap_or(0.0),
        change_percent: value_as_f64(quote.get("10. change percent")).unwrap_or(0.0),
        volume: value_as_f64(quote.get("06. volume")),
        high: value_as_f64(quote.get("03. high")),
        low: value_as_f64(quote.get("04. low")),
        open: value_as_f64(quote.get("02. open")),
        previous_close: value_as_f64(quote.get("08. previous close")),
    }))
}

fn parse_date(key: &str) -> Option<NaiveDate> {
    // intraday keys carry a time suffix ("2024-01-05 16:00")
    NaiveDate::parse_from_str(key.get(..10)?, "%Y-%m-%d").ok()
}

/// Parse a `Technical Analysis: <FN>` payload into a date-keyed series.
/// Rows that fail to parse are skipped.
pub fn parse_indicator_series(
    request: IndicatorRequest,
    body: &Value,
) -> Result<Option<IndicatorSeries>, AnalysisError> {
    let section = format!("Technical Analysis: {}", request.function_name());
    let Some(rows) = body.get(&section).and_then(Value::as_object) else {
        return Ok(None);
    };

    let mut series = IndicatorSeries::new(request);
    for (key, row) in rows {
        let Some(date) = parse_date(key) else {
            continue;
        };
        let value = match request {
            IndicatorRequest::Macd { .. } => {
                match (
                    value_as_f64(row.get("MACD")),
                    value_as_f64(row.get("MACD_Signal")),
                    value_as_f64(row.get("MACD_Hist")),
                ) {
                    (Some(macd), Some(signal), Some(histogram)) => {
                        IndicatorValue::Macd { macd, signal, histogram }
                    }
                    _ => continue,
                }
            }
            _ => match value_as_f64(row.get(request.function_name())) {
                Some(v) => IndicatorValue::Single(v),
                None => continue,
            },
        };
        series.values.insert(date, value);
    }

    if series.is_empty() {
        return Ok(None);
    }
    Ok(Some(series))
}

/// Parse a `TIME_SERIES_DAILY` payload into bars, oldest first.
pub fn parse_daily_bars(body: &Value) -> Result<Option<Vec<Bar>>, AnalysisError> {
    let Some(rows) = body.get("Time Series (Daily)").and_then(Value::as_object) else {
        return Ok(None);
    };

    let mut bars: Vec<Bar> = rows
        .iter()
        .filter_map(|(key, row)| {
            Some(Bar {
                date: parse_date(key)?,
                open: value_as_f64(row.get("1. open"))?,
                high: value_as_f64(row.get("2. high"))?,
                low: value_as_f64(row.get("3. low"))?,
                close: value_as_f64(row.get("4. close"))?,
                volume: value_as_f64(row.get("5. volume")).unwrap_or(0.0),
            })
        })
        .collect();

    if bars.is_empty() {
        return Ok(None);
    }
    bars.sort_by_key(|b| b.date);
    Ok(Some(bars))
}

#[async_trait]
impl QuoteProvider for AlphaVantageClient {
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, AnalysisError> {
        let body = self
            .query(&[("function", "GLOBAL_QUOTE".to_string()), ("symbol", symbol.to_string())])
            .await?;
        parse_global_quote(symbol, &body)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl IndicatorProvider for AlphaVantageClient {
    async fn get_technical_indicator(
        &self,
        symbol: &str,
        request: IndicatorRequest,
    ) -> Result<Option<IndicatorSeries>, AnalysisError> {
        let mut params = vec![
            ("function", request.function_name().to_string()),
            ("symbol", symbol.to_string()),
            ("interval", "daily".to_string()),
            ("series_type", "close".to_string()),
        ];
        match request {
            IndicatorRequest::Rsi { period } | IndicatorRequest::Sma { period } => {
                params.push(("time_period", period.to_string()));
            }
            IndicatorRequest::Macd { fast, slow, signal } => {
                params.push(("fastperiod", fast.to_string()));
                params.push(("slowperiod", slow.to_string()));
                params.push(("signalperiod", signal.to_string()));
            }
        }

        let body = self.query(&params).await?;
        parse_indicator_series(request, &body)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl PriceHistoryProvider for AlphaVantageClient {
    async fn get_daily_bars(&self, symbol: &str) -> Result<Option<Vec<Bar>>, AnalysisError> {
        let body = self
            .query(&[
                ("function", "TIME_SERIES_DAILY".to_string()),
                ("symbol", symbol.to_string()),
                ("outputsize", "compact".to_string()),
            ])
            .await?;
        parse_daily_bars(&body)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_global_quote() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "AAPL",
                "02. open": "149.00",
                "03. high": "151.20",
                "04. low": "148.50",
                "05. price": "150.25",
                "06. volume": "51234567",
                "07. latest trading day": "2024-01-05",
                "08. previous close": "148.00",
                "09. change": "2.25",
                "10. change percent": "1.5203%"
            }
        });

        let quote = parse_global_quote("AAPL", &body).unwrap().unwrap();
        assert_eq!(quote.price, 150.25);
        assert_eq!(quote.change, 2.25);
        assert!((quote.change_percent - 1.5203).abs() < 1e-9);
        assert_eq!(quote.previous_close, Some(148.0));
        assert_eq!(quote.volume, Some(51234567.0));
    }

    #[test]
    fn test_empty_global_quote_is_absent() {
        let body = json!({ "Global Quote": {} });
        assert!(parse_global_quote("NOPE", &body).unwrap().is_none());
    }

    #[test]
    fn test_throttle_note_is_rate_limited() {
        let body = json!({ "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute" });
        let err = check_api_messages(&body).unwrap_err();
        assert!(err.is_rate_limited());

        let body = json!({ "Error Message": "Invalid API call" });
        assert!(matches!(check_api_messages(&body), Err(AnalysisError::ApiError(_))));
    }

    #[test]
    fn test_parse_rsi_series() {
        let body = json!({
            "Meta Data": { "1: Symbol": "AAPL" },
            "Technical Analysis: RSI": {
                "2024-01-05": { "RSI": "72.5000" },
                "2024-01-04": { "RSI": "68.1000" },
                "2024-01-03": { "RSI": "bad" }
            }
        });

        let series = parse_indicator_series(IndicatorRequest::rsi(14), &body).unwrap().unwrap();
        assert_eq!(series.values.len(), 2);
        assert_eq!(series.latest(), Some(&IndicatorValue::Single(72.5)));
    }

    #[test]
    fn test_parse_macd_series() {
        let body = json!({
            "Technical Analysis: MACD": {
                "2024-01-05": { "MACD": "1.20", "MACD_Signal": "0.90", "MACD_Hist": "0.30" }
            }
        });

        let series = parse_indicator_series(IndicatorRequest::macd_default(), &body).unwrap().unwrap();
        match series.latest() {
            Some(IndicatorValue::Macd { macd, signal, histogram }) => {
                assert_eq!(*macd, 1.2);
                assert_eq!(*signal, 0.9);
                assert_eq!(*histogram, 0.3);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_missing_section_is_absent() {
        let body = json!({ "Meta Data": {} });
        assert!(parse_indicator_series(IndicatorRequest::sma(20), &body).unwrap().is_none());
    }

    #[test]
    fn test_parse_daily_bars_sorted_oldest_first() {
        let body = json!({
            "Time Series (Daily)": {
                "2024-01-05": { "1. open": "10", "2. high": "12", "3. low": "9", "4. close": "11", "5. volume": "1000" },
                "2024-01-04": { "1. open": "9", "2. high": "10", "3. low": "8", "4. close": "10", "5. volume": "900" }
            }
        });

        let bars = parse_daily_bars(&body).unwrap().unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].date < bars[1].date);
        assert_eq!(bars[1].close, 11.0);
    }
}
