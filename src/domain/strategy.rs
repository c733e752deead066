//! Strategy parameters shared by the backtest and the live planner.

use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::atr::DEFAULT_ATR_PERIOD;
use crate::domain::signal::BACKTEST_CONFIDENCE_THRESHOLD;
use crate::domain::technical::MaWindows;

pub const DEFAULT_CASH_AT_RISK: f64 = 0.05;
pub const DEFAULT_STOP_LOSS_ATR: f64 = 2.0;
pub const DEFAULT_TAKE_PROFIT_ATR: f64 = 4.0;

/// Which exit wins when a single bar touches both the stop and the target.
///
/// This is a fixed tie-break rule, not a model of the intrabar path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPriority {
    TakeProfitFirst,
    StopLossFirst,
}

pub const DEFAULT_EXIT_PRIORITY: ExitPriority = ExitPriority::TakeProfitFirst;

impl FromStr for ExitPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "take_profit_first" => Ok(ExitPriority::TakeProfitFirst),
            "stop_loss_first" => Ok(ExitPriority::StopLossFirst),
            other => Err(format!(
                "unknown exit priority {other:?} (expected take_profit_first or stop_loss_first)"
            )),
        }
    }
}

impl fmt::Display for ExitPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitPriority::TakeProfitFirst => write!(f, "take_profit_first"),
            ExitPriority::StopLossFirst => write!(f, "stop_loss_first"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub confidence_threshold: f64,
    /// Fraction of available cash committed to one new position.
    pub cash_at_risk: f64,
    pub atr_period: usize,
    pub stop_loss_atr: f64,
    pub take_profit_atr: f64,
    pub ma_windows: MaWindows,
    pub exit_priority: ExitPriority,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            confidence_threshold: BACKTEST_CONFIDENCE_THRESHOLD,
            cash_at_risk: DEFAULT_CASH_AT_RISK,
            atr_period: DEFAULT_ATR_PERIOD,
            stop_loss_atr: DEFAULT_STOP_LOSS_ATR,
            take_profit_atr: DEFAULT_TAKE_PROFIT_ATR,
            ma_windows: MaWindows::default(),
            exit_priority: DEFAULT_EXIT_PRIORITY,
        }
    }
}
