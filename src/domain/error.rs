//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for sentitrader.
#[derive(Debug, thiserror::Error)]
pub enum SentitraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("input missing from {source_name}: {reason}")]
    InputMissing { source_name: String, reason: String },

    #[error("parse error in {source_name} at line {line}: {reason}")]
    DataParse {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error("no usable price data for {ticker} on {date}: {reason}")]
    LookupMiss {
        ticker: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid signal value: {value:?}")]
    InvalidSignal { value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SentitraderError {
    /// True for per-ticker misses that the daily loop recovers from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SentitraderError::LookupMiss { .. }
                | SentitraderError::InsufficientData { .. }
                | SentitraderError::InvalidSignal { .. }
        )
    }
}

impl From<&SentitraderError> for std::process::ExitCode {
    fn from(err: &SentitraderError) -> Self {
        let code: u8 = match err {
            SentitraderError::Io(_) => 1,
            SentitraderError::ConfigParse { .. }
            | SentitraderError::ConfigMissing { .. }
            | SentitraderError::ConfigInvalid { .. } => 2,
            SentitraderError::InputMissing { .. } | SentitraderError::DataParse { .. } => 3,
            SentitraderError::LookupMiss { .. } | SentitraderError::InsufficientData { .. } => 5,
            SentitraderError::InvalidSignal { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
