//! Plain-file backtest report.
//!
//! Writes four files into the output directory:
//! `ledger.csv`, `portfolio_value.csv`, `equity.svg` and `summary.txt`.

pub mod chart_svg;

use std::fs;
use std::path::Path;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SentitraderError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

pub const LEDGER_FILE: &str = "ledger.csv";
pub const VALUE_FILE: &str = "portfolio_value.csv";
pub const CHART_FILE: &str = "equity.svg";
pub const SUMMARY_FILE: &str = "summary.txt";

#[derive(Debug, Default)]
pub struct FileReportAdapter;

impl FileReportAdapter {
    pub fn new() -> Self {
        FileReportAdapter
    }
}

fn csv_error(path: &Path, e: csv::Error) -> SentitraderError {
    SentitraderError::Io(std::io::Error::other(format!("{}: {e}", path.display())))
}

fn write_ledger(result: &BacktestResult, path: &Path) -> Result<(), SentitraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(["date", "action", "ticker", "quantity", "price"])
        .map_err(|e| csv_error(path, e))?;
    for entry in result.portfolio.ledger.entries() {
        wtr.write_record([
            entry.date.to_string(),
            entry.action.to_string(),
            entry.ticker.clone(),
            entry.quantity.to_string(),
            format!("{:.4}", entry.price),
        ])
        .map_err(|e| csv_error(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_values(result: &BacktestResult, path: &Path) -> Result<(), SentitraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    wtr.write_record(["date", "value"])
        .map_err(|e| csv_error(path, e))?;
    for sample in &result.portfolio.value_series {
        wtr.write_record([sample.date.to_string(), format!("{:.2}", sample.total_value)])
            .map_err(|e| csv_error(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Human-readable run summary.
pub fn render_summary(result: &BacktestResult) -> String {
    let m = Metrics::compute(&result.portfolio);
    let mut out = String::new();
    out.push_str("--- Backtest Complete ---\n");
    out.push_str(&format!("Period:              {} to {}\n", result.start_date, result.end_date));
    out.push_str(&format!("Initial capital:     ${:.2}\n", result.portfolio.initial_capital));
    out.push_str(&format!("Final Portfolio Value: ${:.2}\n", m.final_value));
    out.push_str(&format!("Total Return:        {:.2}%\n", m.total_return_pct));
    out.push_str(&format!("Total Trades Made:   {}\n", m.entries));
    out.push_str(&format!("Round trips:         {}\n", m.round_trips));
    out.push_str(&format!("Open positions:      {}\n", m.open_positions));
    out.push_str(&format!("Win rate:            {:.1}%\n", m.win_rate * 100.0));
    out.push_str(&format!("Profit factor:       {:.2}\n", m.profit_factor));
    out.push_str(&format!("Max drawdown:        {:.2}% over {} days\n", m.max_drawdown * 100.0, m.max_drawdown_days));
    out.push_str(&format!("Skipped signals:     {}\n", result.skipped.len()));
    out
}

impl ReportPort for FileReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &str) -> Result<(), SentitraderError> {
        let dir = Path::new(output_dir);
        fs::create_dir_all(dir)?;

        write_ledger(result, &dir.join(LEDGER_FILE))?;
        write_values(result, &dir.join(VALUE_FILE))?;

        let svg = chart_svg::generate_value_svg(&result.portfolio.value_series);
        if !svg.is_empty() {
            fs::write(dir.join(CHART_FILE), svg)?;
        }
        fs::write(dir.join(SUMMARY_FILE), render_summary(result))?;

        info!(dir = %dir.display(), "report written");
        Ok(())
    }
}
