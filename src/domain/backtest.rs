//! Backtest engine and daily event loop.
//!
//! One iteration per calendar day from the first to the last news date,
//! always in this order: exits, signal ranking, confirmation and entry,
//! end-of-day valuation. Per-ticker misses are logged and skipped; only an
//! empty price or news table aborts the run.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::error::SentitraderError;
use super::execution::{check_exits, evaluate_entry, EntryOutcome};
use super::news::{date_range, NewsItem};
use super::portfolio::Portfolio;
use super::price_table::PriceTable;
use super::signal::top_signal;
use super::strategy::Strategy;
use super::technical::TechnicalSignal;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Defaults to the first news date.
    pub start_date: Option<NaiveDate>,
    /// Defaults to the last news date.
    pub end_date: Option<NaiveDate>,
    pub strategy: Strategy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            start_date: None,
            end_date: None,
            strategy: Strategy::default(),
        }
    }
}

/// Why a day's top signal did not become a position.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    AlreadyHeld,
    NotConfirmed { technical: TechnicalSignal },
    InsufficientCapital,
    MissingData { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSignal {
    pub date: NaiveDate,
    pub ticker: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub portfolio: Portfolio,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub skipped: Vec<SkippedSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestSummary {
    pub final_value: f64,
    pub total_return_pct: f64,
    pub trade_count: usize,
}

impl BacktestResult {
    pub fn summary(&self) -> BacktestSummary {
        let initial = self.portfolio.initial_capital;
        let final_value = self.portfolio.final_value();
        let total_return_pct = if initial > 0.0 {
            (final_value - initial) / initial * 100.0
        } else {
            0.0
        };
        BacktestSummary {
            final_value,
            total_return_pct,
            trade_count: self.portfolio.ledger.entry_count(),
        }
    }
}

fn group_by_date(news: &[NewsItem]) -> BTreeMap<NaiveDate, Vec<NewsItem>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<NewsItem>> = BTreeMap::new();
    for item in news {
        grouped.entry(item.date()).or_default().push(item.clone());
    }
    grouped
}

pub fn run_backtest(
    prices: &PriceTable,
    news: &[NewsItem],
    config: &BacktestConfig,
) -> Result<BacktestResult, SentitraderError> {
    if prices.is_empty() {
        return Err(SentitraderError::InputMissing {
            source_name: "price table".into(),
            reason: "no price data loaded".into(),
        });
    }
    let (first_news, last_news) = date_range(news).ok_or_else(|| SentitraderError::InputMissing {
        source_name: "news table".into(),
        reason: "no news rows loaded".into(),
    })?;

    let start_date = config.start_date.unwrap_or(first_news);
    let end_date = config.end_date.unwrap_or(last_news);
    let strategy = &config.strategy;
    let news_by_date = group_by_date(news);

    let mut portfolio = Portfolio::new(config.initial_capital);
    let mut skipped = Vec::new();

    info!(%start_date, %end_date, cash = config.initial_capital, "backtest started");

    for date in start_date.iter_days().take_while(|d| *d <= end_date) {
        // (1) exits
        check_exits(&mut portfolio, prices, date, strategy.exit_priority);

        // (2) signal generation + ranking
        let todays_news = news_by_date.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        if !todays_news.is_empty() {
            debug!(%date, items = todays_news.len(), "news found");
        }

        // (3) confirmation + entry for the top signal
        if let Some(signal) = top_signal(todays_news, strategy.confidence_threshold) {
            let ticker = signal.primary_ticker().unwrap_or_default().to_string();
            info!(%date, ticker = %ticker, direction = %signal.direction, confidence = signal.confidence, "sentiment signal");

            let reason = match evaluate_entry(&mut portfolio, prices, &signal, date, strategy) {
                Ok(EntryOutcome::Opened(_)) => None,
                Ok(EntryOutcome::AlreadyHeld) => Some(SkipReason::AlreadyHeld),
                Ok(EntryOutcome::NotConfirmed { technical }) => {
                    Some(SkipReason::NotConfirmed { technical })
                }
                Ok(EntryOutcome::InsufficientCapital) => Some(SkipReason::InsufficientCapital),
                Err(e) if e.is_recoverable() => Some(SkipReason::MissingData {
                    reason: e.to_string(),
                }),
                Err(e) => return Err(e),
            };

            if let Some(reason) = reason {
                warn!(%date, ticker = %ticker, ?reason, "signal skipped");
                skipped.push(SkippedSignal {
                    date,
                    ticker,
                    reason,
                });
            }
        }

        // (4) end-of-day valuation
        let marks = prices.marks(portfolio.positions.keys().map(String::as_str), date);
        let total_value = portfolio.total_value(&marks);
        portfolio.record_value(date, total_value);
    }

    let result = BacktestResult {
        portfolio,
        start_date,
        end_date,
        skipped,
    };
    let summary = result.summary();
    info!(
        final_value = summary.final_value,
        total_return_pct = summary.total_return_pct,
        trades = summary.trade_count,
        "backtest finished"
    );
    Ok(result)
}
