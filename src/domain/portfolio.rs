//! Portfolio state and value tracking.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::ledger::TradeLedger;
use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValueSample {
    pub date: NaiveDate,
    pub total_value: f64,
    /// Uninvested cash at the end of the day.
    pub cash: f64,
}

/// Cash plus at most one open position per ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub ledger: TradeLedger,
    pub closed_trades: Vec<ClosedTrade>,
    pub value_series: Vec<PortfolioValueSample>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            ledger: TradeLedger::new(),
            closed_trades: Vec::new(),
            value_series: Vec::new(),
        }
    }

    /// Inserts the position unless the ticker is already held.
    pub fn add_position(&mut self, position: Position) -> bool {
        if self.positions.contains_key(&position.ticker) {
            return false;
        }
        self.positions.insert(position.ticker.clone(), position);
        true
    }

    pub fn has_position(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn remove_position(&mut self, ticker: &str) -> Option<Position> {
        self.positions.remove(ticker)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.closed_trades.push(trade);
    }

    pub fn record_value(&mut self, date: NaiveDate, total_value: f64) {
        self.value_series.push(PortfolioValueSample {
            date,
            total_value,
            cash: self.cash,
        });
    }

    /// Cash plus every position marked at `marks`, or at its entry price
    /// when the ticker has no mark.
    pub fn total_value(&self, marks: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| {
                let price = marks.get(&pos.ticker).copied().unwrap_or(pos.entry_price);
                pos.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    pub fn final_value(&self) -> f64 {
        self.value_series
            .last()
            .map(|s| s.total_value)
            .unwrap_or(self.cash)
    }
}
