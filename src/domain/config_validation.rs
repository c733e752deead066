//! Configuration validation.
//!
//! Runs before any data is loaded so a bad key fails fast with the
//! section and key named. Absent optional keys are fine; present keys
//! must parse and fall inside their allowed range.

use crate::domain::error::SentitraderError;
use crate::domain::strategy::ExitPriority;
use crate::domain::universe::StockUniverse;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SentitraderError> {
    if let Some(capital) = read_f64(config, "backtest", "initial_capital")? {
        if capital <= 0.0 {
            return Err(invalid("backtest", "initial_capital", "must be positive"));
        }
    }
    validate_dates(config)?;
    if let Some(dir) = config.get_string("backtest", "output_dir") {
        if dir.trim().is_empty() {
            return Err(invalid("backtest", "output_dir", "must not be empty"));
        }
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SentitraderError> {
    validate_fraction(config, "strategy", "confidence_threshold")?;
    validate_fraction(config, "strategy", "cash_at_risk")?;
    validate_positive_int(config, "strategy", "atr_period")?;
    validate_positive(config, "strategy", "stop_loss_atr")?;
    validate_positive(config, "strategy", "take_profit_atr")?;
    validate_windows(config)?;
    if let Some(value) = config.get_string("strategy", "exit_priority") {
        value
            .parse::<ExitPriority>()
            .map_err(|reason| invalid("strategy", "exit_priority", &reason))?;
    }
    Ok(())
}

pub fn validate_live_config(config: &dyn ConfigPort) -> Result<(), SentitraderError> {
    validate_fraction(config, "live", "confidence_threshold")?;
    validate_fraction(config, "live", "cash_at_risk")?;
    validate_fraction(config, "live", "max_allocation")?;
    validate_positive_int(config, "live", "seen_capacity")?;
    Ok(())
}

pub fn validate_universe_config(config: &dyn ConfigPort) -> Result<(), SentitraderError> {
    let entries = config.section_entries("universe");
    if entries.is_empty() {
        return Ok(());
    }
    StockUniverse::from_entries(entries)
        .map(|_| ())
        .map_err(|e| invalid("universe", "*", &e.to_string()))
}

/// All sections in one pass.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), SentitraderError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    validate_live_config(config)?;
    validate_universe_config(config)
}

pub fn parse_config_date(
    value: &str,
    section: &str,
    key: &str,
) -> Result<NaiveDate, SentitraderError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| invalid(section, key, "invalid date format, expected YYYY-MM-DD"))
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SentitraderError> {
    let start = config
        .get_string("backtest", "start_date")
        .map(|s| parse_config_date(&s, "backtest", "start_date"))
        .transpose()?;
    let end = config
        .get_string("backtest", "end_date")
        .map(|s| parse_config_date(&s, "backtest", "end_date"))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid("backtest", "start_date", "must not be after end_date"));
        }
    }
    Ok(())
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), SentitraderError> {
    validate_positive_int(config, "strategy", "fast_window")?;
    validate_positive_int(config, "strategy", "slow_window")?;
    let fast = config.get_int("strategy", "fast_window", 20);
    let slow = config.get_int("strategy", "slow_window", 50);
    if fast >= slow {
        return Err(invalid(
            "strategy",
            "fast_window",
            "must be smaller than slow_window",
        ));
    }
    Ok(())
}

fn validate_fraction(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), SentitraderError> {
    match read_f64(config, section, key)? {
        Some(v) if v <= 0.0 || v > 1.0 => Err(invalid(section, key, "must be in (0, 1]")),
        _ => Ok(()),
    }
}

fn validate_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), SentitraderError> {
    match read_f64(config, section, key)? {
        Some(v) if v <= 0.0 => Err(invalid(section, key, "must be positive")),
        _ => Ok(()),
    }
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), SentitraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v > 0 => Ok(()),
        Ok(_) => Err(invalid(section, key, "must be a positive integer")),
        Err(_) => Err(invalid(section, key, "not an integer")),
    }
}

fn read_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, SentitraderError> {
    config
        .get_string(section, key)
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| invalid(section, key, "not a number"))
        })
        .transpose()
}

fn invalid(section: &str, key: &str, reason: &str) -> SentitraderError {
    SentitraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
