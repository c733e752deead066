//! One polling cycle of the live variant, as a pure planning step.
//!
//! The cycle never talks to a broker. It takes the account state, the new
//! headline batch and the seen-id memory, and returns at most one bracket
//! order plus the updated memory. Sleeping between cycles and submitting
//! orders belong to the caller.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

use super::execution::{bracket_levels, size_position};
use super::indicator::atr::latest_atr;
use super::news::NewsItem;
use super::price_table::PriceTable;
use super::signal::{top_signal, Direction, LIVE_CONFIDENCE_THRESHOLD};
use super::strategy::{Strategy, DEFAULT_CASH_AT_RISK};
use crate::ports::sentiment_port::SentimentPort;

pub const DEFAULT_MAX_ALLOCATION: f64 = 0.10;
pub const DEFAULT_SEEN_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    /// Threshold and cash fraction here override the backtest defaults.
    pub strategy: Strategy,
    /// Cap on one ticker's share of portfolio value after the new trade.
    pub max_allocation: f64,
    pub seen_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        LiveConfig {
            strategy: Strategy {
                confidence_threshold: LIVE_CONFIDENCE_THRESHOLD,
                cash_at_risk: DEFAULT_CASH_AT_RISK,
                ..Strategy::default()
            },
            max_allocation: DEFAULT_MAX_ALLOCATION,
            seen_capacity: DEFAULT_SEEN_CAPACITY,
        }
    }
}

/// Bounded memory of processed headline ids; evicts oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenHeadlines {
    capacity: usize,
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenHeadlines {
    pub fn with_capacity(capacity: usize) -> Self {
        SeenHeadlines {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns false if `id` was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.ids.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub portfolio_value: f64,
    /// Market value of each currently held ticker.
    pub position_values: HashMap<String, f64>,
}

impl AccountSnapshot {
    pub fn held_value(&self, ticker: &str) -> f64 {
        self.position_values.get(ticker).copied().unwrap_or(0.0)
    }
}

/// A headline as fetched, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHeadline {
    /// Stable identity across cycles, e.g. the article link.
    pub id: String,
    pub title: String,
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketOrder {
    pub ticker: String,
    pub direction: Direction,
    pub quantity: u64,
    pub reference_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleSkip {
    NoNewHeadlines,
    NoTaggedHeadlines,
    ClassifierFailed { reason: String },
    NoSignal,
    AllocationCapExceeded {
        ticker: String,
        held_value: f64,
        cash_for_trade: f64,
        cap: f64,
    },
    MissingPriceData { ticker: String, reason: String },
    ZeroQuantity { ticker: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub order: Option<BracketOrder>,
    pub skip: Option<CycleSkip>,
    pub seen: SeenHeadlines,
}

impl CycleOutcome {
    fn skipped(skip: CycleSkip, seen: SeenHeadlines) -> Self {
        CycleOutcome {
            order: None,
            skip: Some(skip),
            seen,
        }
    }
}

/// Plan a single live cycle.
///
/// `prices` supplies recent bars for the last close and ATR as of `as_of`.
/// New headline ids are recorded in the returned memory unless the
/// classifier failed, in which case they are retried next cycle.
pub fn plan_cycle(
    config: &LiveConfig,
    account: &AccountSnapshot,
    headlines: &[RawHeadline],
    classifier: &dyn SentimentPort,
    prices: &PriceTable,
    as_of: NaiveDateTime,
    mut seen: SeenHeadlines,
) -> CycleOutcome {
    let fresh: Vec<&RawHeadline> = headlines.iter().filter(|h| !seen.contains(&h.id)).collect();
    if fresh.is_empty() {
        debug!("no new headlines this cycle");
        return CycleOutcome::skipped(CycleSkip::NoNewHeadlines, seen);
    }
    info!(count = fresh.len(), "new headlines to analyse");

    let tagged: Vec<&RawHeadline> = fresh.iter().copied().filter(|h| !h.tickers.is_empty()).collect();
    let outcome = decide(config, account, &tagged, classifier, prices, as_of);

    if let Err(CycleSkip::ClassifierFailed { reason }) = &outcome {
        warn!(%reason, "classifier failed, headlines left unseen");
        let skip = CycleSkip::ClassifierFailed {
            reason: reason.clone(),
        };
        return CycleOutcome::skipped(skip, seen);
    }

    for headline in &fresh {
        seen.insert(&headline.id);
    }

    match outcome {
        Ok(order) => CycleOutcome {
            order: Some(order),
            skip: None,
            seen,
        },
        Err(skip) => CycleOutcome::skipped(skip, seen),
    }
}

fn decide(
    config: &LiveConfig,
    account: &AccountSnapshot,
    tagged: &[&RawHeadline],
    classifier: &dyn SentimentPort,
    prices: &PriceTable,
    as_of: NaiveDateTime,
) -> Result<BracketOrder, CycleSkip> {
    if tagged.is_empty() {
        return Err(CycleSkip::NoTaggedHeadlines);
    }

    let titles: Vec<&str> = tagged.iter().map(|h| h.title.as_str()).collect();
    let classifications = classifier
        .classify(&titles)
        .map_err(|e| CycleSkip::ClassifierFailed {
            reason: e.to_string(),
        })?;
    if classifications.len() != tagged.len() {
        return Err(CycleSkip::ClassifierFailed {
            reason: format!(
                "expected {} classifications, got {}",
                tagged.len(),
                classifications.len()
            ),
        });
    }

    let news: Vec<NewsItem> = tagged
        .iter()
        .zip(classifications)
        .map(|(h, c)| NewsItem {
            timestamp: as_of,
            title: h.title.clone(),
            tickers: h.tickers.clone(),
            sentiment: c.sentiment,
            confidence: c.confidence,
        })
        .collect();

    let strategy = &config.strategy;
    let signal = top_signal(&news, strategy.confidence_threshold).ok_or(CycleSkip::NoSignal)?;
    let ticker = signal.primary_ticker().ok_or(CycleSkip::NoSignal)?.to_string();
    info!(%ticker, direction = %signal.direction, confidence = signal.confidence, "top signal");

    let pv = account.portfolio_value;
    let cash_for_trade = pv * strategy.cash_at_risk;
    let held_value = account.held_value(&ticker);
    let cap = pv * config.max_allocation;
    if held_value + cash_for_trade > cap {
        warn!(%ticker, held_value, cash_for_trade, cap, "allocation cap exceeded");
        return Err(CycleSkip::AllocationCapExceeded {
            ticker,
            held_value,
            cash_for_trade,
            cap,
        });
    }

    let (last_close, atr) = levels_inputs(prices, &ticker, as_of.date(), strategy.atr_period)?;
    let quantity = size_position(pv, strategy.cash_at_risk, last_close);
    if quantity == 0 {
        return Err(CycleSkip::ZeroQuantity { ticker });
    }
    let (stop_loss, take_profit) = bracket_levels(signal.direction, last_close, atr, strategy);
    let (stop_loss, take_profit) = (round_to_cents(stop_loss), round_to_cents(take_profit));

    info!(%ticker, quantity, last_close, stop_loss, take_profit, "bracket order planned");
    Ok(BracketOrder {
        ticker,
        direction: signal.direction,
        quantity,
        reference_price: last_close,
        stop_loss,
        take_profit,
    })
}

/// Bracket legs are quoted in whole cents.
fn round_to_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

fn levels_inputs(
    prices: &PriceTable,
    ticker: &str,
    as_of: NaiveDate,
    atr_period: usize,
) -> Result<(f64, f64), CycleSkip> {
    let missing = |reason: String| CycleSkip::MissingPriceData {
        ticker: ticker.to_string(),
        reason,
    };
    let history = prices.history_through(ticker, as_of);
    let last_close = history
        .last()
        .map(|bar| bar.close)
        .ok_or_else(|| missing("no bars on or before cycle date".into()))?;
    let atr = latest_atr(history, atr_period).map_err(|e| missing(e.to_string()))?;
    Ok((last_close, atr))
}
