//! Dated, ticker-tagged, classified headlines.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SentitraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl FromStr for Sentiment {
    type Err = SentitraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(SentitraderError::InvalidSignal {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

/// Classifier output for one headline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub timestamp: NaiveDateTime,
    pub title: String,
    /// First entry is the primary ticker.
    pub tickers: Vec<String>,
    pub sentiment: Sentiment,
    pub confidence: f64,
}

impl NewsItem {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Keep the first occurrence of each exact title, preserving order.
pub fn dedup_by_title(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.title.clone()))
        .collect()
}

/// First and last publication dates, `None` for an empty table.
pub fn date_range(items: &[NewsItem]) -> Option<(NaiveDate, NaiveDate)> {
    let first = items.iter().map(NewsItem::date).min()?;
    let last = items.iter().map(NewsItem::date).max()?;
    Some((first, last))
}
