//! Technical indicator implementations.
//!
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorValue`: output shape of an indicator at one date
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series of indicator values

pub mod atr;
pub mod sma;

use chrono::NaiveDate;
use std::fmt;

/// `valid` is false while the indicator is still inside its warmup window.
/// Values inside the warmup are still carried, callers decide whether to use them.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Volatility { true_range: f64, atr: f64 },
}

impl IndicatorValue {
    /// The headline number of the value: the average for SMA, the ATR for volatility.
    pub fn primary(&self) -> f64 {
        match self {
            IndicatorValue::Simple(v) => *v,
            IndicatorValue::Volatility { atr, .. } => *atr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Atr(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn last(&self) -> Option<&IndicatorPoint> {
        self.values.last()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
        }
    }
}
