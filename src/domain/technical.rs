//! Dual moving-average trend confirmation.
//!
//! fast SMA > slow SMA ⇒ Buy, fast < slow ⇒ Sell, otherwise Hold.
//! Either average undefined (short history) counts as Hold.

use std::fmt;

use crate::domain::indicator::sma::latest_sma;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::Direction;

pub const DEFAULT_FAST_WINDOW: usize = 20;
pub const DEFAULT_SLOW_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechnicalSignal {
    Buy,
    Sell,
    Hold,
}

impl TechnicalSignal {
    /// Hard veto: only an exact direction match confirms a sentiment signal.
    pub fn confirms(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (TechnicalSignal::Buy, Direction::Buy) | (TechnicalSignal::Sell, Direction::Sell)
        )
    }
}

impl fmt::Display for TechnicalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TechnicalSignal::Buy => write!(f, "BUY"),
            TechnicalSignal::Sell => write!(f, "SELL"),
            TechnicalSignal::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaWindows {
    pub fast: usize,
    pub slow: usize,
}

impl Default for MaWindows {
    fn default() -> Self {
        MaWindows {
            fast: DEFAULT_FAST_WINDOW,
            slow: DEFAULT_SLOW_WINDOW,
        }
    }
}

pub fn ma_crossover_signal(bars: &[OhlcvBar], windows: MaWindows) -> TechnicalSignal {
    let fast = latest_sma(bars, windows.fast);
    let slow = latest_sma(bars, windows.slow);

    match (fast, slow) {
        (Some(f), Some(s)) if f > s => TechnicalSignal::Buy,
        (Some(f), Some(s)) if f < s => TechnicalSignal::Sell,
        _ => TechnicalSignal::Hold,
    }
}
