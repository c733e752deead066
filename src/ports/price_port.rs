//! Historical price access port.

use crate::domain::error::SentitraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait PricePort {
    /// Bars for `ticker` within `[start, end]`, ascending by date.
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SentitraderError>;

    fn list_tickers(&self) -> Result<Vec<String>, SentitraderError>;

    /// `(first date, last date, bar count)`, or `None` for an empty series.
    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SentitraderError>;
}
