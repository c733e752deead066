//! Per-ticker CSV price files.
//!
//! One `<TICKER>.csv` per ticker in a directory. Columns are located by
//! header name (case-insensitive), so extra columns such as `adj close`
//! are ignored. `volume` is optional.

use crate::domain::error::SentitraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::price_table::PriceTable;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord, source: &str) -> Result<Self, SentitraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| SentitraderError::DataParse {
                source_name: source.to_string(),
                line: 1,
                reason: format!("missing required column '{name}'"),
            })
        };

        Ok(Columns {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
        })
    }
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }

    fn read_all(&self, ticker: &str) -> Result<Vec<OhlcvBar>, SentitraderError> {
        let path = self.csv_path(ticker);
        let source = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| SentitraderError::InputMissing {
            source_name: source.clone(),
            reason: e.to_string(),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| parse_error(&source, 1, e))?.clone();
        let cols = Columns::from_headers(&headers, &source)?;

        let mut bars = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let line = idx as u64 + 2;
            let record = result.map_err(|e| parse_error(&source, line, e))?;
            bars.push(parse_bar(ticker, &record, &cols, &source, line)?);
        }

        bars.sort_by_key(|b| b.date);
        debug!(ticker, bars = bars.len(), "price file read");
        Ok(bars)
    }
}

fn parse_error(source: &str, line: u64, reason: impl ToString) -> SentitraderError {
    SentitraderError::DataParse {
        source_name: source.to_string(),
        line,
        reason: reason.to_string(),
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str, source: &str, line: u64) -> Result<&'r str, SentitraderError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| parse_error(source, line, format!("missing {name} value")))
}

fn parse_price(record: &StringRecord, idx: usize, name: &str, source: &str, line: u64) -> Result<f64, SentitraderError> {
    field(record, idx, name, source, line)?
        .parse()
        .map_err(|e| parse_error(source, line, format!("invalid {name} value: {e}")))
}

fn parse_bar(
    ticker: &str,
    record: &StringRecord,
    cols: &Columns,
    source: &str,
    line: u64,
) -> Result<OhlcvBar, SentitraderError> {
    let date_str = field(record, cols.date, "date", source, line)?;
    // timestamps such as "2023-01-05 00:00:00" keep only the date part
    let date_part = date_str.split([' ', 'T']).next().unwrap_or(date_str);
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| parse_error(source, line, format!("invalid date '{date_str}': {e}")))?;

    let volume = match cols.volume {
        Some(idx) => {
            let raw = field(record, idx, "volume", source, line)?;
            if raw.is_empty() {
                0
            } else {
                raw.parse::<f64>()
                    .map_err(|e| parse_error(source, line, format!("invalid volume value: {e}")))?
                    as i64
            }
        }
        None => 0,
    };

    Ok(OhlcvBar {
        ticker: ticker.to_string(),
        date,
        open: parse_price(record, cols.open, "open", source, line)?,
        high: parse_price(record, cols.high, "high", source, line)?,
        low: parse_price(record, cols.low, "low", source, line)?,
        close: parse_price(record, cols.close, "close", source, line)?,
        volume,
    })
}

impl PricePort for CsvPriceAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SentitraderError> {
        let mut bars = self.read_all(ticker)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, SentitraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SentitraderError::InputMissing {
            source_name: self.base_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(ticker) = name.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SentitraderError> {
        let bars = self.read_all(ticker)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

/// Load every listed ticker into a table.
///
/// Tickers whose file fails to load are logged and left out; the caller
/// decides whether an empty table is fatal.
pub fn load_price_table(
    port: &dyn PricePort,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> PriceTable {
    let mut bars = Vec::new();
    for ticker in tickers {
        match port.fetch_bars(ticker, start, end) {
            Ok(series) if series.is_empty() => warn!(%ticker, "no bars in range, skipping"),
            Ok(series) => bars.extend(series),
            Err(e) => warn!(%ticker, error = %e, "price load failed, skipping"),
        }
    }
    let table = PriceTable::from_bars(bars);
    info!(tickers = table.tickers().len(), "price table loaded");
    table
}
