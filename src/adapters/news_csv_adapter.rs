//! Classified-headline CSV reader.
//!
//! Expected header: `timestamp,title,tickers,sentiment,confidence`.
//! Rows with an unknown sentiment label are logged and dropped; any other
//! malformed row fails the load.

use crate::domain::error::SentitraderError;
use crate::domain::news::{dedup_by_title, NewsItem, Sentiment};
use crate::domain::universe::StockUniverse;
use crate::ports::news_port::NewsPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const REQUIRED_COLUMNS: [&str; 5] = ["timestamp", "title", "tickers", "sentiment", "confidence"];

pub struct CsvNewsAdapter {
    path: PathBuf,
    universe: Option<StockUniverse>,
}

impl CsvNewsAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            universe: None,
        }
    }

    /// Rows with an empty ticker list get tagged with `universe`.
    pub fn with_universe(mut self, universe: StockUniverse) -> Self {
        self.universe = Some(universe);
        self
    }
}

/// Accepts `['AAPL', 'MSFT']`, `["AAPL"]`, `[]` or a plain
/// `;`/`,`/space separated list. Order is preserved.
pub fn parse_ticker_list(raw: &str) -> Vec<String> {
    let inner = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    inner
        .split([',', ';', ' '])
        .map(|t| t.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// `YYYY-MM-DD HH:MM:SS`, RFC 3339 or a bare date (midnight).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn column_indices(headers: &StringRecord, source: &str) -> Result<[usize; 5], SentitraderError> {
    let mut out = [0usize; 5];
    for (slot, name) in out.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| SentitraderError::DataParse {
                source_name: source.to_string(),
                line: 1,
                reason: format!("missing required column '{name}'"),
            })?;
    }
    Ok(out)
}

impl NewsPort for CsvNewsAdapter {
    fn fetch_news(&self) -> Result<Vec<NewsItem>, SentitraderError> {
        let source = self.path.display().to_string();
        let content = fs::read_to_string(&self.path).map_err(|e| SentitraderError::InputMissing {
            source_name: source.clone(),
            reason: e.to_string(),
        })?;

        let parse_error = |line: u64, reason: String| SentitraderError::DataParse {
            source_name: source.clone(),
            line,
            reason,
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| parse_error(1, e.to_string()))?
            .clone();
        let [ts_col, title_col, tickers_col, sentiment_col, confidence_col] =
            column_indices(&headers, &source)?;

        let mut items = Vec::new();
        let mut dropped = 0usize;

        for (idx, result) in rdr.records().enumerate() {
            let line = idx as u64 + 2;
            let record = result.map_err(|e| parse_error(line, e.to_string()))?;
            let get = |col: usize| record.get(col).unwrap_or("").trim();

            let timestamp = parse_timestamp(get(ts_col))
                .ok_or_else(|| parse_error(line, format!("invalid timestamp '{}'", get(ts_col))))?;
            let title = get(title_col).to_string();

            let sentiment = match get(sentiment_col).parse::<Sentiment>() {
                Ok(s) => s,
                Err(e) => {
                    warn!(line, error = %e, "dropping headline with unknown sentiment");
                    dropped += 1;
                    continue;
                }
            };
            let confidence: f64 = get(confidence_col)
                .parse()
                .map_err(|e| parse_error(line, format!("invalid confidence: {e}")))?;

            let mut tickers = parse_ticker_list(get(tickers_col));
            if tickers.is_empty() {
                if let Some(universe) = &self.universe {
                    tickers = universe.tag_headline(&title);
                    if !tickers.is_empty() {
                        debug!(line, ?tickers, "headline tagged from universe");
                    }
                }
            }

            items.push(NewsItem {
                timestamp,
                title,
                tickers,
                sentiment,
                confidence,
            });
        }

        let read = items.len();
        let items = dedup_by_title(items);
        info!(
            source = %source,
            rows = read,
            kept = items.len(),
            dropped_invalid = dropped,
            "news loaded"
        );
        Ok(items)
    }
}
