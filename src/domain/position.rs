//! Open positions with fixed bracket levels.

use chrono::NaiveDate;

use crate::domain::signal::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub direction: Direction,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    /// Cash released if the position were closed at `price`.
    ///
    /// Long: quantity × price. Short: the escrowed entry notional plus the
    /// price gain, floored at zero so a short can never owe more than its escrow.
    pub fn market_value(&self, price: f64) -> f64 {
        let qty = self.quantity as f64;
        match self.direction {
            Direction::Buy => qty * price,
            Direction::Sell => qty * (2.0 * self.entry_price - price).max(0.0),
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.market_value(price) - self.quantity as f64 * self.entry_price
    }

    /// Long: high reaches target. Short: low reaches target.
    pub fn hits_take_profit(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Buy => high >= self.take_profit,
            Direction::Sell => low <= self.take_profit,
        }
    }

    /// Long: low breaches stop. Short: high breaches stop.
    pub fn hits_stop_loss(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Buy => low <= self.stop_loss,
            Direction::Sell => high >= self.stop_loss,
        }
    }
}

/// A completed round trip, kept for performance statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub ticker: String,
    pub direction: Direction,
    pub quantity: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
}
