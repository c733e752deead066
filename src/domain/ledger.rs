//! Append-only trade ledger.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeAction {
    Enter,
    ExitTakeProfit,
    ExitStopLoss,
}

impl TradeAction {
    pub fn is_exit(self) -> bool {
        !matches!(self, TradeAction::Enter)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Enter => write!(f, "ENTER"),
            TradeAction::ExitTakeProfit => write!(f, "EXIT_TP"),
            TradeAction::ExitStopLoss => write!(f, "EXIT_SL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeLedgerEntry {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub ticker: String,
    pub quantity: u64,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLedger {
    entries: Vec<TradeLedgerEntry>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        date: NaiveDate,
        action: TradeAction,
        ticker: &str,
        quantity: u64,
        price: f64,
    ) {
        self.entries.push(TradeLedgerEntry {
            date,
            action,
            ticker: ticker.to_string(),
            quantity,
            price,
        });
    }

    pub fn entries(&self) -> &[TradeLedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ENTER rows; this is the reported trade count.
    pub fn entry_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action == TradeAction::Enter)
            .count()
    }
}
