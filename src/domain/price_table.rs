//! Price history keyed by (ticker, date).

use crate::domain::error::SentitraderError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TickerSeries {
    pub ticker: String,
    pub bars: Vec<OhlcvBar>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl TickerSeries {
    /// Sorts `bars` ascending by date before indexing.
    pub fn new(ticker: String, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            ticker,
            bars,
            date_index,
        }
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    /// Bars dated on or before `date`.
    pub fn history_through(&self, date: NaiveDate) -> &[OhlcvBar] {
        let end = self.bars.partition_point(|b| b.date <= date);
        &self.bars[..end]
    }

    pub fn latest_close(&self, date: NaiveDate) -> Option<f64> {
        self.history_through(date).last().map(|b| b.close)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    series: HashMap<String, TickerSeries>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: TickerSeries) {
        self.series.insert(series.ticker.clone(), series);
    }

    /// Groups a flat list of bars by their ticker.
    pub fn from_bars(bars: Vec<OhlcvBar>) -> Self {
        let mut grouped: HashMap<String, Vec<OhlcvBar>> = HashMap::new();
        for bar in bars {
            grouped.entry(bar.ticker.clone()).or_default().push(bar);
        }
        let mut table = PriceTable::new();
        for (ticker, bars) in grouped {
            table.insert(TickerSeries::new(ticker, bars));
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn tickers(&self) -> Vec<&str> {
        let mut tickers: Vec<&str> = self.series.keys().map(String::as_str).collect();
        tickers.sort_unstable();
        tickers
    }

    pub fn get_bar(&self, ticker: &str, date: NaiveDate) -> Option<&OhlcvBar> {
        self.series.get(ticker)?.get_bar(date)
    }

    /// The bar for `date`, or a `LookupMiss` when the ticker did not trade.
    pub fn require_bar(&self, ticker: &str, date: NaiveDate) -> Result<&OhlcvBar, SentitraderError> {
        let series = self.series.get(ticker).ok_or_else(|| SentitraderError::LookupMiss {
            ticker: ticker.to_string(),
            date,
            reason: "ticker not in price table".to_string(),
        })?;
        series.get_bar(date).ok_or_else(|| SentitraderError::LookupMiss {
            ticker: ticker.to_string(),
            date,
            reason: "no bar for date".to_string(),
        })
    }

    pub fn history_through(&self, ticker: &str, date: NaiveDate) -> &[OhlcvBar] {
        self.series
            .get(ticker)
            .map(|s| s.history_through(date))
            .unwrap_or(&[])
    }

    /// Latest known close on or before `date` for each ticker that has one.
    pub fn marks<'a, I>(&self, tickers: I, date: NaiveDate) -> HashMap<String, f64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        tickers
            .into_iter()
            .filter_map(|t| {
                let close = self.series.get(t)?.latest_close(date)?;
                Some((t.to_string(), close))
            })
            .collect()
    }
}
