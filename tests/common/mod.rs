#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use sentitrader::domain::backtest::BacktestConfig;
use sentitrader::domain::error::SentitraderError;
use sentitrader::domain::news::{Classification, NewsItem, Sentiment};
pub use sentitrader::domain::ohlcv::OhlcvBar;
use sentitrader::domain::strategy::Strategy;
use sentitrader::domain::technical::MaWindows;
use sentitrader::ports::news_port::NewsPort;
use sentitrader::ports::price_port::PricePort;
use sentitrader::ports::sentiment_port::SentimentPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockPricePort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    fn check(&self, ticker: &str) -> Result<(), SentitraderError> {
        match self.errors.get(ticker) {
            Some(reason) => Err(SentitraderError::InputMissing {
                source_name: ticker.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl PricePort for MockPricePort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SentitraderError> {
        self.check(ticker)?;
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, SentitraderError> {
        let mut tickers: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SentitraderError> {
        self.check(ticker)?;
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub struct MockNewsPort {
    pub items: Vec<NewsItem>,
}

impl NewsPort for MockNewsPort {
    fn fetch_news(&self) -> Result<Vec<NewsItem>, SentitraderError> {
        Ok(self.items.clone())
    }
}

/// Classifier that answers from a title → classification table and
/// records every batch it was asked about.
pub struct MockSentiment {
    pub answers: HashMap<String, Classification>,
    pub batches: RefCell<Vec<Vec<String>>>,
}

impl MockSentiment {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            batches: RefCell::new(Vec::new()),
        }
    }

    pub fn answer(mut self, title: &str, sentiment: Sentiment, confidence: f64) -> Self {
        self.answers.insert(
            title.to_string(),
            Classification {
                sentiment,
                confidence,
            },
        );
        self
    }
}

impl SentimentPort for MockSentiment {
    fn classify(&self, headlines: &[&str]) -> Result<Vec<Classification>, SentitraderError> {
        self.batches
            .borrow_mut()
            .push(headlines.iter().map(|h| h.to_string()).collect());
        Ok(headlines
            .iter()
            .map(|h| {
                self.answers.get(*h).copied().unwrap_or(Classification {
                    sentiment: Sentiment::Neutral,
                    confidence: 0.5,
                })
            })
            .collect())
    }
}

pub fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(n as i64 - 1)
}

pub fn make_bar(ticker: &str, date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        ticker: ticker.to_string(),
        date,
        open,
        high,
        low,
        close,
        volume: 1_000,
    }
}

/// One bar per day for `days` days; open = close = `price(d)`, range ±1.
pub fn trending_bars(ticker: &str, days: u32, price: impl Fn(u32) -> f64) -> Vec<OhlcvBar> {
    (1..=days)
        .map(|d| {
            let p = price(d);
            make_bar(ticker, day(d), p, p + 1.0, p - 1.0, p)
        })
        .collect()
}

pub fn rising_bars(ticker: &str, days: u32) -> Vec<OhlcvBar> {
    trending_bars(ticker, days, |d| 100.0 + d as f64)
}

pub fn falling_bars(ticker: &str, days: u32) -> Vec<OhlcvBar> {
    trending_bars(ticker, days, |d| 200.0 - d as f64)
}

pub fn headline(d: u32, title: &str, tickers: &[&str], sentiment: Sentiment, confidence: f64) -> NewsItem {
    NewsItem {
        timestamp: day(d).and_hms_opt(9, 30, 0).unwrap(),
        title: title.to_string(),
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        sentiment,
        confidence,
    }
}

/// Short MA windows so a handful of bars is enough history.
pub fn quick_strategy() -> Strategy {
    Strategy {
        ma_windows: MaWindows { fast: 2, slow: 5 },
        ..Strategy::default()
    }
}

pub fn quick_config(end: Option<NaiveDate>) -> BacktestConfig {
    BacktestConfig {
        end_date: end,
        strategy: quick_strategy(),
        ..BacktestConfig::default()
    }
}
