use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Latest trade snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub previous_close: Option<f64>,
}

/// Which indicator series to request, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "indicator", rename_all = "lowercase")]
pub enum IndicatorRequest {
    Rsi { period: usize },
    Macd { fast: usize, slow: usize, signal: usize },
    Sma { period: usize },
}

impl IndicatorRequest {
    pub fn rsi(period: usize) -> Self {
        IndicatorRequest::Rsi { period }
    }

    pub fn macd_default() -> Self {
        IndicatorRequest::Macd { fast: 12, slow: 26, signal: 9 }
    }

    pub fn sma(period: usize) -> Self {
        IndicatorRequest::Sma { period }
    }

    /// Provider-facing function name (RSI, MACD, SMA).
    pub fn function_name(&self) -> &'static str {
        match self {
            IndicatorRequest::Rsi { .. } => "RSI",
            IndicatorRequest::Macd { .. } => "MACD",
            IndicatorRequest::Sma { .. } => "SMA",
        }
    }
}

/// A single indicator reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Macd { macd: f64, signal: f64, histogram: f64 },
    Single(f64),
}

impl IndicatorValue {
    pub fn as_single(&self) -> Option<f64> {
        match self {
            IndicatorValue::Single(v) => Some(*v),
            IndicatorValue::Macd { .. } => None,
        }
    }
}

/// Date-keyed indicator readings, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub request: IndicatorRequest,
    pub values: BTreeMap<NaiveDate, IndicatorValue>,
}

impl IndicatorSeries {
    pub fn new(request: IndicatorRequest) -> Self {
        Self {
            request,
            values: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<&IndicatorValue> {
        self.values.values().next_back()
    }

    /// Up to `n` most recent readings, newest first.
    pub fn recent(&self, n: usize) -> Vec<IndicatorValue> {
        self.values.values().rev().take(n).copied().collect()
    }
}

/// Polarity label shared by articles and aggregated sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// ±0.1 dead zone around zero.
    pub fn from_score(score: f64) -> Self {
        if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArticleSentiment {
    pub score: f64,
    pub label: SentimentLabel,
}

impl ArticleSentiment {
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            label: SentimentLabel::from_score(score),
        }
    }
}

/// News article, optionally carrying a provider-supplied polarity score in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sentiment: Option<ArticleSentiment>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl NewsArticle {
    pub fn sentiment_score(&self) -> Option<f64> {
        self.sentiment.map(|s| s.score)
    }
}

/// Direction of a technical signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// Signal strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Strong,
    Moderate,
    Neutral,
}

/// Judgment derived from a single indicator family. `score` is always in [-2, 2].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub action: SignalAction,
    pub strength: SignalStrength,
    pub score: i32,
    pub reason: String,
}

impl TechnicalSignal {
    pub fn new(action: SignalAction, strength: SignalStrength, score: i32, reason: impl Into<String>) -> Self {
        Self {
            action,
            strength,
            score: score.clamp(-2, 2),
            reason: reason.into(),
        }
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(SignalAction::Hold, SignalStrength::Neutral, 0, reason)
    }
}

/// Aggregate of all available per-indicator signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallTechnicalSignal {
    pub action: SignalAction,
    pub strength: SignalStrength,
    pub confidence: f64,
    pub reason: String,
}

impl OverallTechnicalSignal {
    pub fn no_data() -> Self {
        Self {
            action: SignalAction::Hold,
            strength: SignalStrength::Neutral,
            confidence: 0.0,
            reason: "No technical data available".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_label_dead_zone() {
        assert_eq!(SentimentLabel::from_score(0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0.11), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(-0.1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.25), SentimentLabel::Negative);
    }

    #[test]
    fn test_series_recent_is_newest_first() {
        let mut series = IndicatorSeries::new(IndicatorRequest::rsi(14));
        for (day, v) in [(1, 40.0), (2, 45.0), (3, 50.0)] {
            let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
            series.values.insert(date, IndicatorValue::Single(v));
        }

        assert_eq!(series.latest(), Some(&IndicatorValue::Single(50.0)));
        let recent: Vec<f64> = series.recent(2).iter().filter_map(|v| v.as_single()).collect();
        assert_eq!(recent, vec![50.0, 45.0]);
    }

    #[test]
    fn test_technical_signal_score_is_clamped() {
        let signal = TechnicalSignal::new(SignalAction::Buy, SignalStrength::Strong, 5, "x");
        assert_eq!(signal.score, 2);
    }

    #[test]
    fn test_indicator_value_untagged_serde() {
        let single: IndicatorValue = serde_json::from_str("42.5").unwrap();
        assert_eq!(single, IndicatorValue::Single(42.5));

        let macd: IndicatorValue =
            serde_json::from_str(r#"{"macd":1.0,"signal":0.5,"histogram":0.5}"#).unwrap();
        assert!(matches!(macd, IndicatorValue::Macd { .. }));
    }
}
