//! Stock universe and headline-to-ticker tagging.
//!
//! A universe is an ordered list of tickers, each with lowercase search
//! terms. Tagging is a plain substring match against the lowercased title;
//! tag order follows universe order, so the first tag is the primary one.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),

    #[error("ticker {0} has no search terms")]
    NoTerms(String),
}

/// Comma-separated tickers, trimmed and uppercased, order kept.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockUniverse {
    entries: Vec<(String, Vec<String>)>,
}

const DEFAULT_UNIVERSE: &[(&str, &[&str])] = &[
    ("AAPL", &["apple", "iphone"]),
    ("MSFT", &["microsoft", "windows"]),
    ("GOOGL", &["google", "alphabet"]),
    ("TSLA", &["tesla", "elon musk"]),
    ("NVDA", &["nvidia", "gpu", "gpus"]),
    ("AMZN", &["amazon", "aws"]),
    ("META", &["meta", "facebook", "instagram"]),
    ("NFLX", &["netflix"]),
    ("INTC", &["intel"]),
    ("SHOP", &["shopify"]),
    ("JPM", &["jpmorgan", "jpmorgan chase"]),
    ("BAC", &["bank of america"]),
    ("V", &["visa"]),
    ("MA", &["mastercard"]),
    ("WMT", &["walmart"]),
    ("COST", &["costco"]),
    ("NKE", &["nike"]),
    ("MCD", &["mcdonald's"]),
    ("KO", &["coca-cola", "coke"]),
    ("DIS", &["disney", "walt disney"]),
    ("JNJ", &["johnson & johnson", "j&j"]),
    ("PFE", &["pfizer"]),
    ("MRNA", &["moderna"]),
    ("CVX", &["chevron"]),
    ("XOM", &["exxonmobil", "exxon"]),
    ("BA", &["boeing"]),
    ("LMT", &["lockheed martin", "lockheed"]),
    ("NOC", &["northrop grumman", "northrop"]),
    ("RTX", &["rtx", "raytheon"]),
    ("GD", &["general dynamics"]),
    ("T", &["at&t"]),
];

impl StockUniverse {
    /// Builds a universe from `(ticker, comma-separated terms)` pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, UniverseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for (ticker, terms) in entries {
            let ticker = ticker.as_ref().trim().to_uppercase();
            if ticker.is_empty() {
                return Err(UniverseError::EmptyToken);
            }
            if !seen.insert(ticker.clone()) {
                return Err(UniverseError::DuplicateTicker(ticker));
            }
            let terms: Vec<String> = terms
                .as_ref()
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if terms.is_empty() {
                return Err(UniverseError::NoTerms(ticker));
            }
            out.push((ticker, terms));
        }

        Ok(StockUniverse { entries: out })
    }

    pub fn default_universe() -> Self {
        StockUniverse {
            entries: DEFAULT_UNIVERSE
                .iter()
                .map(|(ticker, terms)| {
                    (
                        ticker.to_string(),
                        terms.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn terms(&self, ticker: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, terms)| terms.as_slice())
    }

    /// Every ticker with at least one term inside `title`, in universe order.
    pub fn tag_headline(&self, title: &str) -> Vec<String> {
        let lowered = title.to_lowercase();
        self.entries
            .iter()
            .filter(|(_, terms)| terms.iter().any(|term| lowered.contains(term.as_str())))
            .map(|(ticker, _)| ticker.clone())
            .collect()
    }
}

impl Default for StockUniverse {
    fn default() -> Self {
        StockUniverse::default_universe()
    }
}
