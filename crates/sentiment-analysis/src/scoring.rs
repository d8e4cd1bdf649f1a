//! Pure sentiment scoring over already-fetched articles.

use analysis_core::{stats, NewsArticle, SentimentLabel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{HeadlineSummary, MarketMood, MarketTopic, NewsHighlight, NewsTheme, SentimentResult, SentimentSummary};

const HEADLINE_MAX_CHARS: usize = 100;
const MAX_HEADLINES: usize = 3;
const MAX_HIGHLIGHTS: usize = 5;
const MAX_TOPICS: usize = 5;

/// Window parameters for per-symbol scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWindow {
    /// Only the first `examined` articles contribute to the score.
    pub examined: usize,
    /// Scored-article count at which confidence saturates at 1.0.
    pub full_confidence_at: usize,
}

impl Default for ScoringWindow {
    fn default() -> Self {
        Self {
            examined: 10,
            full_confidence_at: 10,
        }
    }
}

impl NewsTheme {
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            NewsTheme::Earnings => &["earnings", "revenue", "profit"],
            NewsTheme::AnalystUpgrade => &["upgrade", "buy", "target"],
            NewsTheme::AnalystDowngrade => &["downgrade", "sell", "cut"],
            NewsTheme::BusinessDevelopment => &["partnership", "deal", "contract"],
        }
    }
}

pub fn classify_themes(title: &str) -> Vec<NewsTheme> {
    let lower = title.to_lowercase();
    NewsTheme::ALL
        .iter()
        .copied()
        .filter(|theme| theme.keywords().iter().any(|kw| lower.contains(kw)))
        .collect()
}

pub fn classify_topics(title: &str) -> Vec<MarketTopic> {
    let lower = title.to_lowercase();
    // "ai" must be a whole word, otherwise "said" and "rain" match
    let has_word = |w: &str| lower.split(|c: char| !c.is_alphanumeric()).any(|t| t == w);

    let mut topics = Vec::new();
    if lower.contains("fed") || lower.contains("interest rate") {
        topics.push(MarketTopic::MonetaryPolicy);
    }
    if lower.contains("inflation") {
        topics.push(MarketTopic::Inflation);
    }
    if lower.contains("earnings") {
        topics.push(MarketTopic::EarningsSeason);
    }
    if has_word("ai") || lower.contains("artificial intelligence") {
        topics.push(MarketTopic::AiTechnology);
    }
    if lower.contains("crypto") || lower.contains("bitcoin") {
        topics.push(MarketTopic::Cryptocurrency);
    }
    topics
}

pub fn truncate_headline(title: &str) -> String {
    if title.chars().count() > HEADLINE_MAX_CHARS {
        let cut: String = title.chars().take(HEADLINE_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    }
}

fn headline(article: &NewsArticle) -> HeadlineSummary {
    HeadlineSummary {
        title: truncate_headline(&article.title),
        source: article.source.clone(),
        sentiment: article
            .sentiment
            .map(|s| s.label)
            .unwrap_or(SentimentLabel::Neutral),
        published_at: article.published_at,
    }
}

/// Score one symbol from its recent articles (newest first).
///
/// Only the first `window.examined` articles are considered, and only the
/// ones with a non-zero polarity contribute. With nothing to score the result
/// is neutral with zero confidence, but headlines and article count are kept.
pub fn score_symbol(subject: &str, articles: &[NewsArticle], window: ScoringWindow) -> SentimentResult {
    let examined = &articles[..articles.len().min(window.examined)];

    let scores: Vec<f64> = examined
        .iter()
        .filter_map(NewsArticle::sentiment_score)
        .filter(|s| *s != 0.0)
        .collect();

    let themes: BTreeSet<NewsTheme> = examined
        .iter()
        .flat_map(|a| classify_themes(&a.title))
        .collect();

    let recent_headlines = examined.iter().take(MAX_HEADLINES).map(headline).collect();

    let (score, confidence) = if scores.is_empty() {
        (0.0, 0.0)
    } else {
        let confidence = (scores.len() as f64 / window.full_confidence_at.max(1) as f64).min(1.0);
        (stats::mean(&scores).clamp(-1.0, 1.0), confidence)
    };

    SentimentResult {
        subject: subject.to_string(),
        score,
        label: SentimentLabel::from_score(score),
        confidence,
        article_count: articles.len(),
        scored_count: scores.len(),
        themes: themes.into_iter().collect(),
        recent_headlines,
    }
}

/// Portfolio sentiment: confidence-weighted mean of symbol scores, plain mean
/// when every confidence is zero. Confidence is the mean symbol confidence.
pub fn aggregate_portfolio(symbols: &[SentimentResult]) -> SentimentResult {
    let mut result = SentimentResult::neutral("portfolio");
    if symbols.is_empty() {
        return result;
    }

    let pairs: Vec<(f64, f64)> = symbols.iter().map(|s| (s.score, s.confidence)).collect();
    let scores: Vec<f64> = symbols.iter().map(|s| s.score).collect();
    let confidences: Vec<f64> = symbols.iter().map(|s| s.confidence).collect();

    let score = stats::weighted_mean(&pairs).unwrap_or_else(|| stats::mean(&scores));
    result.score = score;
    result.label = SentimentLabel::from_score(score);
    result.confidence = stats::mean(&confidences).min(1.0);
    result.article_count = symbols.iter().map(|s| s.article_count).sum();
    result.scored_count = symbols.iter().map(|s| s.scored_count).sum();
    result
}

/// Market-wide score over a general news sample. Every non-zero article score counts.
pub fn score_market(articles: &[NewsArticle]) -> (SentimentResult, Vec<MarketTopic>) {
    let window = ScoringWindow {
        examined: articles.len(),
        full_confidence_at: ScoringWindow::default().full_confidence_at,
    };
    let result = score_symbol("market", articles, window);

    let mut topics: Vec<MarketTopic> = Vec::new();
    for topic in articles.iter().flat_map(|a| classify_topics(&a.title)) {
        if !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    topics.truncate(MAX_TOPICS);

    (result, topics)
}

pub fn market_mood(score: f64) -> MarketMood {
    if score > 0.3 {
        MarketMood::Bullish
    } else if score > 0.1 {
        MarketMood::Optimistic
    } else if score < -0.3 {
        MarketMood::Bearish
    } else if score < -0.1 {
        MarketMood::Pessimistic
    } else {
        MarketMood::Neutral
    }
}

/// Non-neutral headlines across holdings, positive first, at most five.
pub fn news_highlights(symbols: &[SentimentResult]) -> Vec<NewsHighlight> {
    let mut highlights: Vec<NewsHighlight> = symbols
        .iter()
        .flat_map(|s| {
            s.recent_headlines
                .iter()
                .filter(|h| h.sentiment != SentimentLabel::Neutral)
                .map(move |h| NewsHighlight {
                    symbol: s.subject.clone(),
                    title: h.title.clone(),
                    sentiment: h.sentiment,
                    source: h.source.clone(),
                })
        })
        .collect();

    // stable: keeps holding order within each polarity
    highlights.sort_by_key(|h| h.sentiment == SentimentLabel::Negative);
    highlights.truncate(MAX_HIGHLIGHTS);
    highlights
}

pub fn summarize(overall: &SentimentResult, symbols: &[SentimentResult]) -> SentimentSummary {
    let pick = |label: SentimentLabel| -> Vec<String> {
        symbols
            .iter()
            .filter(|s| s.label == label)
            .map(|s| s.subject.clone())
            .collect()
    };

    SentimentSummary {
        overall_mood: overall.label,
        positive_stocks: pick(SentimentLabel::Positive),
        negative_stocks: pick(SentimentLabel::Negative),
        neutral_stocks: pick(SentimentLabel::Neutral),
    }
}
