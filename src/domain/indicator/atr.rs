//! Average True Range volatility estimator.
//!
//! TR[0] = H[0] - L[0]; TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR is an exponentially weighted average of TR with alpha = 1/n,
//! seeded with TR[0]: ATR[i] = alpha*TR[i] + (1-alpha)*ATR[i-1].
//! The first (n-1) points are flagged invalid but still carry a value.

use crate::domain::error::SentitraderError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_ATR_PERIOD: usize = 14;

pub fn calc_atr(bars: &[OhlcvBar], period: usize) -> Result<IndicatorSeries, SentitraderError> {
    let Some(first) = bars.first() else {
        return Err(SentitraderError::InsufficientData {
            ticker: String::new(),
            bars: 0,
            minimum: 1,
        });
    };

    let period = period.max(1);
    let alpha = 1.0 / period as f64;

    let mut values = Vec::with_capacity(bars.len());
    let mut atr = first.range();
    let mut prev_close = first.close;

    for (i, bar) in bars.iter().enumerate() {
        let true_range = if i == 0 {
            bar.range()
        } else {
            bar.true_range(prev_close)
        };
        if i > 0 {
            atr = alpha * true_range + (1.0 - alpha) * atr;
        }
        prev_close = bar.close;

        values.push(IndicatorPoint {
            date: bar.date,
            valid: i + 1 >= period,
            value: IndicatorValue::Volatility { true_range, atr },
        });
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    })
}

/// ATR value of the final bar in `bars`.
pub fn latest_atr(bars: &[OhlcvBar], period: usize) -> Result<f64, SentitraderError> {
    let series = calc_atr(bars, period)?;
    series
        .last()
        .map(|p| p.value.primary())
        .ok_or_else(|| SentitraderError::InsufficientData {
            ticker: String::new(),
            bars: 0,
            minimum: 1,
        })
}
