//! Core domain types and logic.

pub mod ohlcv;
pub mod news;
pub mod signal;
pub mod technical;
pub mod position;
pub mod portfolio;
pub mod ledger;
pub mod price_table;
pub mod execution;
pub mod indicator;
pub mod backtest;
pub mod metrics;
pub mod strategy;
pub mod universe;
pub mod live;
pub mod config_validation;
pub mod error;
