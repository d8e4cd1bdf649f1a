use analysis_orchestrator::OrchestratorSettings;
use anyhow::{bail, Context, Result};
use notification_service::NotificationConfig;
use portfolio_manager::ValuationSettings;
use recommendation_engine::RecommendationSettings;
use std::path::PathBuf;
use std::str::FromStr;
use technical_analysis::TechnicalSettings;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    // External APIs
    pub alpha_vantage_api_key: Option<String>,
    pub finnhub_api_key: Option<String>,
    pub marketaux_api_key: Option<String>,

    pub notifications: NotificationConfig,
    pub portfolio_file: PathBuf,
    /// Snapshot of the response cache kept between runs.
    pub cache_file: PathBuf,

    // Risk thresholds (fractions)
    pub max_position_size: f64,       // 0.15
    pub profit_taking_threshold: f64, // 0.20
    pub stop_loss_threshold: f64,     // -0.10
    pub min_cash_reserve: f64,        // 0.05
    pub high_volatility_threshold: f64, // 0.10

    /// Daily move, in percent, that raises a price alert.
    pub price_alert_threshold: f64,

    // Technical analysis
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub sma_short: usize,
    pub sma_long: usize,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}", key))
}

impl TrackerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            alpha_vantage_api_key: key("ALPHA_VANTAGE_API_KEY"),
            finnhub_api_key: key("FINNHUB_API_KEY"),
            marketaux_api_key: key("MARKETAUX_API_KEY"),
            notifications: NotificationConfig::from_lookup(&lookup),
            portfolio_file: key("PORTFOLIO_FILE")
                .unwrap_or_else(|| "portfolio.json".to_string())
                .into(),
            cache_file: key("CACHE_FILE")
                .unwrap_or_else(|| "data/cache/responses.json".to_string())
                .into(),

            max_position_size: parse_or(&lookup, "MAX_POSITION_SIZE", "0.15")?,
            profit_taking_threshold: parse_or(&lookup, "PROFIT_TAKING_THRESHOLD", "0.20")?,
            stop_loss_threshold: parse_or(&lookup, "STOP_LOSS_THRESHOLD", "-0.10")?,
            min_cash_reserve: parse_or(&lookup, "MIN_CASH_RESERVE", "0.05")?,
            high_volatility_threshold: parse_or(&lookup, "HIGH_VOLATILITY_THRESHOLD", "0.10")?,
            price_alert_threshold: parse_or(&lookup, "PRICE_ALERT_THRESHOLD", "5.0")?,

            rsi_period: parse_or(&lookup, "RSI_PERIOD", "14")?,
            rsi_oversold: parse_or(&lookup, "RSI_OVERSOLD", "30")?,
            rsi_overbought: parse_or(&lookup, "RSI_OVERBOUGHT", "70")?,
            sma_short: parse_or(&lookup, "SMA_SHORT", "20")?,
            sma_long: parse_or(&lookup, "SMA_LONG", "50")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.max_position_size > 0.0 && self.max_position_size <= 1.0) {
            bail!("MAX_POSITION_SIZE must be in (0, 1], got {}", self.max_position_size);
        }
        if self.profit_taking_threshold <= 0.0 {
            bail!("PROFIT_TAKING_THRESHOLD must be positive, got {}", self.profit_taking_threshold);
        }
        if self.stop_loss_threshold >= 0.0 {
            bail!("STOP_LOSS_THRESHOLD must be negative, got {}", self.stop_loss_threshold);
        }
        if !(0.0..1.0).contains(&self.min_cash_reserve) {
            bail!("MIN_CASH_RESERVE must be in [0, 1), got {}", self.min_cash_reserve);
        }
        if self.high_volatility_threshold <= 0.0 || self.price_alert_threshold <= 0.0 {
            bail!("Volatility and price alert thresholds must be positive");
        }
        if self.rsi_period < 2 {
            bail!("RSI_PERIOD must be at least 2, got {}", self.rsi_period);
        }
        if self.rsi_oversold >= self.rsi_overbought {
            bail!(
                "RSI_OVERSOLD ({}) must be below RSI_OVERBOUGHT ({})",
                self.rsi_oversold,
                self.rsi_overbought
            );
        }
        if self.sma_short == 0 || self.sma_short >= self.sma_long {
            bail!("SMA_SHORT ({}) must be positive and below SMA_LONG ({})", self.sma_short, self.sma_long);
        }
        self.notifications.validate()?;
        Ok(())
    }

    /// The one key without which no market data can be fetched.
    pub fn require_alpha_vantage_key(&self) -> Result<&str> {
        self.alpha_vantage_api_key
            .as_deref()
            .context("ALPHA_VANTAGE_API_KEY not set")
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let defaults = TechnicalSettings::default();
        // keep the strong bands as wide as the defaults relative to the thresholds
        let technical = TechnicalSettings {
            rsi_period: self.rsi_period,
            rsi_oversold: self.rsi_oversold,
            rsi_overbought: self.rsi_overbought,
            rsi_strong_oversold: self.rsi_oversold - (defaults.rsi_oversold - defaults.rsi_strong_oversold),
            rsi_strong_overbought: self.rsi_overbought + (defaults.rsi_strong_overbought - defaults.rsi_overbought),
            sma_short: self.sma_short,
            sma_long: self.sma_long,
            ..defaults
        };

        OrchestratorSettings {
            valuation: ValuationSettings {
                alert_threshold_pct: self.price_alert_threshold,
                ..ValuationSettings::default()
            },
            technical,
            sentiment: Default::default(),
            recommendation: RecommendationSettings {
                max_position_size: self.max_position_size,
                concentration: self.max_position_size,
                profit_taking: self.profit_taking_threshold,
                stop_loss: self.stop_loss_threshold,
                min_cash_reserve: self.min_cash_reserve,
                high_volatility: self.high_volatility_threshold,
                ..RecommendationSettings::default()
            },
        }
    }
}
