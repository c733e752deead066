//! Report output port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SentitraderError;

pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &str) -> Result<(), SentitraderError>;
}
