//! Signal filter and ranker.
//!
//! Classified headlines become directional candidates when they are
//! non-neutral and at or above the confidence threshold. Candidates are
//! ranked by confidence descending with a stable sort, so ties keep their
//! input (chronological) order.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::SentitraderError;
use crate::domain::news::{NewsItem, Sentiment};

pub const BACKTEST_CONFIDENCE_THRESHOLD: f64 = 0.90;
pub const LIVE_CONFIDENCE_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn from_sentiment(sentiment: Sentiment) -> Option<Direction> {
        match sentiment {
            Sentiment::Positive => Some(Direction::Buy),
            Sentiment::Negative => Some(Direction::Sell),
            Sentiment::Neutral => None,
        }
    }
}

impl FromStr for Direction {
    type Err = SentitraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Direction::Buy),
            "SELL" => Ok(Direction::Sell),
            _ => Err(SentitraderError::InvalidSignal {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub tickers: Vec<String>,
    pub direction: Direction,
    pub confidence: f64,
    pub title: String,
}

impl Signal {
    /// The actionable symbol; only the first tag is traded.
    pub fn primary_ticker(&self) -> Option<&str> {
        self.tickers.first().map(String::as_str)
    }
}

pub fn find_trade_signals(news: &[NewsItem], confidence_threshold: f64) -> Vec<Signal> {
    news.iter()
        .filter(|item| item.confidence >= confidence_threshold)
        .filter_map(|item| {
            let direction = Direction::from_sentiment(item.sentiment)?;
            if item.tickers.is_empty() {
                tracing::debug!(title = %item.title, "signal has no ticker tag, ignoring");
                return None;
            }
            Some(Signal {
                tickers: item.tickers.clone(),
                direction,
                confidence: item.confidence,
                title: item.title.clone(),
            })
        })
        .collect()
}

pub fn rank_signals(mut signals: Vec<Signal>) -> Vec<Signal> {
    // sort_by is stable: equal confidences keep input order.
    signals.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    signals
}

/// Filter, rank and pick the single best candidate for a cycle.
pub fn top_signal(news: &[NewsItem], confidence_threshold: f64) -> Option<Signal> {
    rank_signals(find_trade_signals(news, confidence_threshold))
        .into_iter()
        .next()
}
