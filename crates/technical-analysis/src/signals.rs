//! Pure scoring rules that turn raw indicator readings into signals.

use analysis_core::{OverallTechnicalSignal, SignalAction, SignalStrength, TechnicalSignal};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds and periods for the technical analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSettings {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_strong_oversold: f64,
    pub rsi_strong_overbought: f64,
    pub sma_short: usize,
    pub sma_long: usize,
    /// Relative SMA gap above which a crossover counts as strong (0.02 = 2%).
    pub sma_strong_gap: f64,
    pub cache_ttl: Duration,
}

impl Default for TechnicalSettings {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_strong_oversold: 20.0,
            rsi_strong_overbought: 80.0,
            sma_short: 20,
            sma_long: 50,
            sma_strong_gap: 0.02,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Direction of the oscillator over its recent readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
    Unknown,
}

pub fn rsi_signal(rsi: f64, settings: &TechnicalSettings) -> TechnicalSignal {
    if rsi >= settings.rsi_overbought {
        let strong = rsi >= settings.rsi_strong_overbought;
        TechnicalSignal::new(
            SignalAction::Sell,
            if strong { SignalStrength::Strong } else { SignalStrength::Moderate },
            if strong { -2 } else { -1 },
            format!("Overbought (RSI: {:.1})", rsi),
        )
    } else if rsi <= settings.rsi_oversold {
        let strong = rsi <= settings.rsi_strong_oversold;
        TechnicalSignal::new(
            SignalAction::Buy,
            if strong { SignalStrength::Strong } else { SignalStrength::Moderate },
            if strong { 2 } else { 1 },
            format!("Oversold (RSI: {:.1})", rsi),
        )
    } else {
        TechnicalSignal::hold(format!("Neutral (RSI: {:.1})", rsi))
    }
}

pub fn macd_signal(macd: f64, signal: f64, histogram: f64) -> TechnicalSignal {
    if macd > signal && histogram > 0.0 {
        TechnicalSignal::new(SignalAction::Buy, SignalStrength::Moderate, 1, "MACD bullish crossover")
    } else if macd < signal && histogram < 0.0 {
        TechnicalSignal::new(SignalAction::Sell, SignalStrength::Moderate, -1, "MACD bearish crossover")
    } else {
        TechnicalSignal::hold("MACD neutral")
    }
}

pub fn sma_signal(short_sma: f64, long_sma: f64, strong_gap: f64) -> TechnicalSignal {
    if long_sma <= 0.0 {
        return TechnicalSignal::hold("SMAs converged");
    }

    if short_sma > long_sma {
        let strong = (short_sma - long_sma) / long_sma > strong_gap;
        TechnicalSignal::new(
            SignalAction::Buy,
            if strong { SignalStrength::Strong } else { SignalStrength::Moderate },
            if strong { 2 } else { 1 },
            format!("Short SMA above long SMA ({:.2} > {:.2})", short_sma, long_sma),
        )
    } else if short_sma < long_sma {
        let strong = (long_sma - short_sma) / long_sma > strong_gap;
        TechnicalSignal::new(
            SignalAction::Sell,
            if strong { SignalStrength::Strong } else { SignalStrength::Moderate },
            if strong { -2 } else { -1 },
            format!("Short SMA below long SMA ({:.2} < {:.2})", short_sma, long_sma),
        )
    } else {
        TechnicalSignal::hold("SMAs converged")
    }
}

/// Combine the available per-indicator signals. Missing indicators are simply
/// not passed in and do not count toward confidence.
pub fn overall_signal(signals: &[&TechnicalSignal]) -> OverallTechnicalSignal {
    if signals.is_empty() {
        return OverallTechnicalSignal::no_data();
    }

    let total: i32 = signals.iter().map(|s| s.score).sum();
    let count = signals.len();
    let confidence = (count as f64 / 3.0).min(1.0);

    let (action, strength, reason) = if total >= 2 {
        (
            SignalAction::Buy,
            if total >= 3 { SignalStrength::Strong } else { SignalStrength::Moderate },
            format!("Bullish signals from {} indicators", count),
        )
    } else if total <= -2 {
        (
            SignalAction::Sell,
            if total <= -3 { SignalStrength::Strong } else { SignalStrength::Moderate },
            format!("Bearish signals from {} indicators", count),
        )
    } else {
        (SignalAction::Hold, SignalStrength::Neutral, "Mixed or neutral signals".to_string())
    };

    OverallTechnicalSignal {
        action,
        strength,
        confidence,
        reason,
    }
}

/// Trend over readings ordered newest first: the mean of the two newest against the mean of the rest.
pub fn rsi_trend(recent_newest_first: &[f64]) -> Trend {
    if recent_newest_first.len() < 2 {
        return Trend::Unknown;
    }

    let recent_avg = (recent_newest_first[0] + recent_newest_first[1]) / 2.0;
    let older = &recent_newest_first[2..];
    let older_avg = if older.is_empty() {
        recent_avg
    } else {
        older.iter().sum::<f64>() / older.len() as f64
    };

    if recent_avg > older_avg + 5.0 {
        Trend::Rising
    } else if recent_avg < older_avg - 5.0 {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Mean absolute score relative to the maximum of 2 per indicator, in [0, 1].
pub fn signal_strength(signals: &[&TechnicalSignal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    let total: i32 = signals.iter().map(|s| s.score.abs()).sum();
    (total as f64 / (signals.len() as f64 * 2.0)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TechnicalSettings {
        TechnicalSettings::default()
    }

    #[test]
    fn test_rsi_thresholds() {
        let cases = [
            (85.0, SignalAction::Sell, SignalStrength::Strong, -2),
            (80.0, SignalAction::Sell, SignalStrength::Strong, -2),
            (75.0, SignalAction::Sell, SignalStrength::Moderate, -1),
            (70.0, SignalAction::Sell, SignalStrength::Moderate, -1),
            (50.0, SignalAction::Hold, SignalStrength::Neutral, 0),
            (30.0, SignalAction::Buy, SignalStrength::Moderate, 1),
            (25.0, SignalAction::Buy, SignalStrength::Moderate, 1),
            (20.0, SignalAction::Buy, SignalStrength::Strong, 2),
            (10.0, SignalAction::Buy, SignalStrength::Strong, 2),
        ];

        for (rsi, action, strength, score) in cases {
            let signal = rsi_signal(rsi, &settings());
            assert_eq!(signal.action, action, "rsi {}", rsi);
            assert_eq!(signal.strength, strength, "rsi {}", rsi);
            assert_eq!(signal.score, score, "rsi {}", rsi);
        }

        assert_eq!(rsi_signal(72.46, &settings()).reason, "Overbought (RSI: 72.5)");
    }

    #[test]
    fn test_macd_requires_histogram_agreement() {
        assert_eq!(macd_signal(1.2, 0.9, 0.3).score, 1);
        assert_eq!(macd_signal(0.5, 0.9, -0.4).score, -1);
        // line above signal but histogram disagrees
        let mixed = macd_signal(1.2, 0.9, -0.1);
        assert_eq!(mixed.action, SignalAction::Hold);
        assert_eq!(mixed.reason, "MACD neutral");
    }

    #[test]
    fn test_sma_gap_strength() {
        let strong = sma_signal(105.0, 100.0, 0.02);
        assert_eq!(strong.score, 2);
        assert_eq!(strong.reason, "Short SMA above long SMA (105.00 > 100.00)");

        assert_eq!(sma_signal(101.0, 100.0, 0.02).score, 1);
        assert_eq!(sma_signal(99.0, 100.0, 0.02).score, -1);
        assert_eq!(sma_signal(95.0, 100.0, 0.02).score, -2);

        let equal = sma_signal(100.0, 100.0, 0.02);
        assert_eq!(equal.score, 0);
        assert_eq!(equal.reason, "SMAs converged");
    }

    #[test]
    fn test_overall_signal() {
        let rsi = rsi_signal(25.0, &settings()); // +1
        let macd = macd_signal(1.0, 0.5, 0.5); // +1
        let sma = sma_signal(105.0, 100.0, 0.02); // +2

        let all = overall_signal(&[&rsi, &macd, &sma]);
        assert_eq!(all.action, SignalAction::Buy);
        assert_eq!(all.strength, SignalStrength::Strong);
        assert!((all.confidence - 1.0).abs() < 1e-9);
        assert_eq!(all.reason, "Bullish signals from 3 indicators");

        let two = overall_signal(&[&rsi, &macd]);
        assert_eq!(two.action, SignalAction::Buy);
        assert_eq!(two.strength, SignalStrength::Moderate);
        assert!((two.confidence - 2.0 / 3.0).abs() < 1e-9);

        let bearish_rsi = rsi_signal(85.0, &settings()); // -2
        let mixed = overall_signal(&[&bearish_rsi, &macd]);
        assert_eq!(mixed.action, SignalAction::Hold);
        assert_eq!(mixed.reason, "Mixed or neutral signals");
    }

    #[test]
    fn test_overall_signal_without_indicators() {
        let none = overall_signal(&[]);
        assert_eq!(none.action, SignalAction::Hold);
        assert_eq!(none.confidence, 0.0);
        assert_eq!(none.reason, "No technical data available");
    }

    #[test]
    fn test_rsi_trend() {
        assert_eq!(rsi_trend(&[]), Trend::Unknown);
        assert_eq!(rsi_trend(&[55.0]), Trend::Unknown);
        assert_eq!(rsi_trend(&[55.0, 50.0]), Trend::Stable);
        assert_eq!(rsi_trend(&[70.0, 68.0, 55.0, 52.0, 50.0]), Trend::Rising);
        assert_eq!(rsi_trend(&[40.0, 42.0, 55.0, 58.0, 60.0]), Trend::Falling);
        assert_eq!(rsi_trend(&[50.0, 51.0, 49.0, 50.0, 52.0]), Trend::Stable);
    }

    #[test]
    fn test_signal_strength() {
        assert_eq!(signal_strength(&[]), 0.0);
        let a = rsi_signal(85.0, &settings()); // |-2|
        let b = macd_signal(1.0, 0.5, 0.5); // |1|
        assert!((signal_strength(&[&a, &b]) - 0.75).abs() < 1e-9);
    }
}
