//! Command-line interface.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::csv_adapter::{load_price_table, CsvPriceAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_report::{render_summary, FileReportAdapter};
use crate::adapters::news_csv_adapter::CsvNewsAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, DEFAULT_INITIAL_CAPITAL};
use crate::domain::config_validation::{parse_config_date, validate_all};
use crate::domain::error::SentitraderError;
use crate::domain::indicator::atr::DEFAULT_ATR_PERIOD;
use crate::domain::live::{LiveConfig, DEFAULT_MAX_ALLOCATION, DEFAULT_SEEN_CAPACITY};
use crate::domain::news::date_range;
use crate::domain::signal::{BACKTEST_CONFIDENCE_THRESHOLD, LIVE_CONFIDENCE_THRESHOLD};
use crate::domain::strategy::{
    ExitPriority, Strategy, DEFAULT_CASH_AT_RISK, DEFAULT_EXIT_PRIORITY, DEFAULT_STOP_LOSS_ATR,
    DEFAULT_TAKE_PROFIT_ATR,
};
use crate::domain::technical::{MaWindows, DEFAULT_FAST_WINDOW, DEFAULT_SLOW_WINDOW};
use crate::domain::universe::{parse_tickers, StockUniverse};
use crate::ports::config_port::ConfigPort;
use crate::ports::news_port::NewsPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT_DIR: &str = "report";

#[derive(Parser, Debug)]
#[command(name = "sentitrader", about = "News-sentiment trading backtester")]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over historical prices and classified news
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <TICKER>.csv price files
        #[arg(long)]
        prices: Option<PathBuf>,
        /// Classified news CSV
        #[arg(long)]
        news: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range of the price files
    Info {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated tickers; all price files when omitted
        #[arg(long)]
        ticker: Option<String>,
    },
    /// Print the tickers a headline would be tagged with
    Tag {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        headline: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Command::Backtest {
            config,
            prices,
            news,
            output,
            dry_run,
        } => run_backtest(&config, prices, news, output, dry_run),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
        Command::Tag { config, headline } => run_tag(&config, &headline),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "sentitrader=debug"
    } else {
        "sentitrader=info"
    };
    // a subscriber may already be installed when run() is called repeatedly
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SentitraderError> {
    FileConfigAdapter::from_file(path).map_err(|e| SentitraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn config_error(section: &str, key: &str, reason: impl ToString) -> SentitraderError {
    SentitraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn read_usize(adapter: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    let value = adapter.get_int(section, key, default as i64);
    usize::try_from(value).unwrap_or(default)
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<Strategy, SentitraderError> {
    let exit_priority = match adapter.get_string("strategy", "exit_priority") {
        Some(raw) => raw
            .parse::<ExitPriority>()
            .map_err(|reason| config_error("strategy", "exit_priority", reason))?,
        None => DEFAULT_EXIT_PRIORITY,
    };

    Ok(Strategy {
        confidence_threshold: adapter.get_double(
            "strategy",
            "confidence_threshold",
            BACKTEST_CONFIDENCE_THRESHOLD,
        ),
        cash_at_risk: adapter.get_double("strategy", "cash_at_risk", DEFAULT_CASH_AT_RISK),
        atr_period: read_usize(adapter, "strategy", "atr_period", DEFAULT_ATR_PERIOD),
        stop_loss_atr: adapter.get_double("strategy", "stop_loss_atr", DEFAULT_STOP_LOSS_ATR),
        take_profit_atr: adapter.get_double("strategy", "take_profit_atr", DEFAULT_TAKE_PROFIT_ATR),
        ma_windows: MaWindows {
            fast: read_usize(adapter, "strategy", "fast_window", DEFAULT_FAST_WINDOW),
            slow: read_usize(adapter, "strategy", "slow_window", DEFAULT_SLOW_WINDOW),
        },
        exit_priority,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, SentitraderError> {
    let date = |key: &str| {
        adapter
            .get_string("backtest", key)
            .map(|raw| parse_config_date(&raw, "backtest", key))
            .transpose()
    };

    Ok(BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        start_date: date("start_date")?,
        end_date: date("end_date")?,
        strategy: build_strategy(adapter)?,
    })
}

/// Live settings on top of the `[strategy]` volatility parameters.
pub fn build_live_config(adapter: &dyn ConfigPort) -> Result<LiveConfig, SentitraderError> {
    let base = build_strategy(adapter)?;
    Ok(LiveConfig {
        strategy: Strategy {
            confidence_threshold: adapter.get_double(
                "live",
                "confidence_threshold",
                LIVE_CONFIDENCE_THRESHOLD,
            ),
            cash_at_risk: adapter.get_double("live", "cash_at_risk", DEFAULT_CASH_AT_RISK),
            ..base
        },
        max_allocation: adapter.get_double("live", "max_allocation", DEFAULT_MAX_ALLOCATION),
        seen_capacity: read_usize(adapter, "live", "seen_capacity", DEFAULT_SEEN_CAPACITY),
    })
}

/// `[universe]` entries, or the built-in universe when the section is absent.
pub fn build_universe(adapter: &dyn ConfigPort) -> Result<StockUniverse, SentitraderError> {
    let entries = adapter.section_entries("universe");
    if entries.is_empty() {
        return Ok(StockUniverse::default_universe());
    }
    StockUniverse::from_entries(entries).map_err(|e| config_error("universe", "*", e))
}

/// Command-line path wins over the config key.
fn resolve_path(
    flag: Option<PathBuf>,
    adapter: &dyn ConfigPort,
    key: &str,
) -> Result<PathBuf, SentitraderError> {
    flag.or_else(|| {
        adapter
            .get_string("backtest", key)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    })
    .ok_or_else(|| SentitraderError::ConfigMissing {
        section: "backtest".into(),
        key: key.into(),
    })
}

fn run_backtest(
    config_path: &Path,
    prices_flag: Option<PathBuf>,
    news_flag: Option<PathBuf>,
    output_flag: Option<PathBuf>,
    dry_run: bool,
) -> Result<(), SentitraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;

    let bt_config = build_backtest_config(&adapter)?;
    let universe = build_universe(&adapter)?;
    let prices_dir = resolve_path(prices_flag, &adapter, "prices_dir")?;
    let news_file = resolve_path(news_flag, &adapter, "news_file")?;
    let output_dir = output_flag
        .or_else(|| adapter.get_string("backtest", "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let news = CsvNewsAdapter::new(news_file)
        .with_universe(universe)
        .fetch_news()?;
    let (first_news, last_news) = date_range(&news).ok_or_else(|| SentitraderError::InputMissing {
        source_name: "news".into(),
        reason: "no usable headlines".into(),
    })?;
    eprintln!("Loaded {} headlines ({first_news} to {last_news})", news.len());

    let price_port = CsvPriceAdapter::new(prices_dir.clone());
    let tickers = price_port.list_tickers()?;
    // history before the first news day feeds the indicator windows
    let prices = load_price_table(&price_port, &tickers, NaiveDate::MIN, NaiveDate::MAX);
    if prices.is_empty() {
        return Err(SentitraderError::InputMissing {
            source_name: prices_dir.display().to_string(),
            reason: "no price files could be loaded".into(),
        });
    }
    eprintln!("Loaded prices for {} tickers", prices.tickers().len());

    if dry_run {
        let s = &bt_config.strategy;
        eprintln!("Dry run: configuration and data OK");
        eprintln!("  capital:        {:.2}", bt_config.initial_capital);
        eprintln!(
            "  period:         {} to {}",
            bt_config.start_date.unwrap_or(first_news),
            bt_config.end_date.unwrap_or(last_news)
        );
        eprintln!("  threshold:      {:.2}", s.confidence_threshold);
        eprintln!("  cash at risk:   {:.2}", s.cash_at_risk);
        eprintln!("  ATR({}) stop {}x target {}x", s.atr_period, s.stop_loss_atr, s.take_profit_atr);
        eprintln!("  MA windows:     {}/{}", s.ma_windows.fast, s.ma_windows.slow);
        eprintln!("  exit priority:  {}", s.exit_priority);
        return Ok(());
    }

    let result = backtest_engine::run_backtest(&prices, &news, &bt_config)?;
    eprint!("{}", render_summary(&result));

    let output = output_dir.display().to_string();
    FileReportAdapter::new().write(&result, &output)?;
    info!(output = %output, "backtest complete");
    eprintln!("Report written to {output}");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SentitraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    let strategy = build_strategy(&adapter)?;
    let universe = build_universe(&adapter)?;

    eprintln!("Configuration OK: {}", config_path.display());
    eprintln!(
        "  threshold {:.2}, cash at risk {:.2}, ATR({}), MA {}/{}, {}",
        strategy.confidence_threshold,
        strategy.cash_at_risk,
        strategy.atr_period,
        strategy.ma_windows.fast,
        strategy.ma_windows.slow,
        strategy.exit_priority
    );
    eprintln!("  universe: {} tickers", universe.len());
    Ok(())
}

fn run_info(config_path: &Path, ticker: Option<&str>) -> Result<(), SentitraderError> {
    let adapter = load_config(config_path)?;
    let prices_dir = resolve_path(None, &adapter, "prices_dir")?;
    let port = CsvPriceAdapter::new(prices_dir);

    let tickers = match ticker {
        Some(list) => parse_tickers(list).map_err(|e| config_error("info", "ticker", e))?,
        None => port.list_tickers()?,
    };

    if tickers.is_empty() {
        eprintln!("No price files found");
        return Ok(());
    }

    for ticker in &tickers {
        match port.get_data_range(ticker)? {
            Some((first, last, count)) => {
                eprintln!("{ticker}: {first} to {last} ({count} bars)")
            }
            None => eprintln!("{ticker}: no data"),
        }
    }
    Ok(())
}

fn run_tag(config_path: &Path, headline: &str) -> Result<(), SentitraderError> {
    let adapter = load_config(config_path)?;
    let universe = build_universe(&adapter)?;
    let tags = universe.tag_headline(headline);

    if tags.is_empty() {
        eprintln!("No tickers matched");
    } else {
        println!("{}", tags.join(","));
    }
    Ok(())
}
