//! Position lifecycle: exit evaluation, sizing and entry.
//!
//! Per ticker a position is either absent or open. Exits are checked
//! against each day's high/low before any entry logic runs. Entries fill
//! at the day's open with bracket levels set from ATR and never change.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::error::SentitraderError;
use super::indicator::atr::latest_atr;
use super::ledger::TradeAction;
use super::ohlcv::OhlcvBar;
use super::portfolio::Portfolio;
use super::position::{ClosedTrade, Position};
use super::price_table::PriceTable;
use super::signal::{Direction, Signal};
use super::strategy::{ExitPriority, Strategy};
use super::technical::{ma_crossover_signal, TechnicalSignal};

/// Whole shares for `fraction` of `cash` at `price`.
///
/// Rounds half away from zero, then clamps so the cost never exceeds `cash`.
pub fn size_position(cash: f64, fraction: f64, price: f64) -> u64 {
    if !(price > 0.0) || !(cash > 0.0) || !(fraction > 0.0) {
        return 0;
    }
    let wanted = (fraction * cash / price).round();
    let affordable = (cash / price).floor();
    wanted.min(affordable).max(0.0) as u64
}

/// (stop_loss, take_profit) around `entry_price`.
///
/// Long: stop below, target above. Short: stop above, target below.
pub fn bracket_levels(direction: Direction, entry_price: f64, atr: f64, strategy: &Strategy) -> (f64, f64) {
    let stop_distance = strategy.stop_loss_atr * atr;
    let target_distance = strategy.take_profit_atr * atr;
    match direction {
        Direction::Buy => (entry_price - stop_distance, entry_price + target_distance),
        Direction::Sell => (entry_price + stop_distance, entry_price - target_distance),
    }
}

/// The exit a bar triggers for `position`, with its fill price.
///
/// Fills are assumed at the bracket level itself.
pub fn evaluate_exit(
    position: &Position,
    bar: &OhlcvBar,
    priority: ExitPriority,
) -> Option<(TradeAction, f64)> {
    let tp = position
        .hits_take_profit(bar.high, bar.low)
        .then_some((TradeAction::ExitTakeProfit, position.take_profit));
    let sl = position
        .hits_stop_loss(bar.high, bar.low)
        .then_some((TradeAction::ExitStopLoss, position.stop_loss));

    match priority {
        ExitPriority::TakeProfitFirst => tp.or(sl),
        ExitPriority::StopLossFirst => sl.or(tp),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub ticker: String,
    pub action: TradeAction,
    pub quantity: u64,
    pub exit_price: f64,
    pub proceeds: f64,
    pub pnl: f64,
}

/// Close `ticker` at `exit_price`, credit cash and append the ledger row.
pub fn exit_position(
    portfolio: &mut Portfolio,
    ticker: &str,
    exit_price: f64,
    date: NaiveDate,
    action: TradeAction,
) -> Option<ExitResult> {
    let position = portfolio.remove_position(ticker)?;

    let proceeds = position.market_value(exit_price);
    let pnl = position.unrealized_pnl(exit_price);
    portfolio.cash += proceeds;
    portfolio
        .ledger
        .record(date, action, ticker, position.quantity, exit_price);
    portfolio.record_trade(ClosedTrade {
        ticker: ticker.to_string(),
        direction: position.direction,
        quantity: position.quantity,
        entry_price: position.entry_price,
        exit_price,
        entry_date: position.entry_date,
        exit_date: date,
        pnl,
    });

    info!(
        %date, ticker, %action, quantity = position.quantity, price = exit_price, pnl,
        "position closed"
    );

    Some(ExitResult {
        ticker: ticker.to_string(),
        action,
        quantity: position.quantity,
        exit_price,
        proceeds,
        pnl,
    })
}

/// Run exit evaluation for every open position on `date`.
///
/// Two passes: first collect triggered tickers, then close them.
/// A ticker with no bar on `date` simply does not exit today.
pub fn check_exits(
    portfolio: &mut Portfolio,
    prices: &PriceTable,
    date: NaiveDate,
    priority: ExitPriority,
) -> Vec<ExitResult> {
    let triggered: Vec<(String, TradeAction, f64)> = portfolio
        .positions
        .values()
        .filter_map(|pos| {
            let Some(bar) = prices.get_bar(&pos.ticker, date) else {
                debug!(%date, ticker = %pos.ticker, "no bar, exit check skipped");
                return None;
            };
            let (action, price) = evaluate_exit(pos, bar, priority)?;
            Some((pos.ticker.clone(), action, price))
        })
        .collect();

    triggered
        .into_iter()
        .filter_map(|(ticker, action, price)| exit_position(portfolio, &ticker, price, date, action))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: u64,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    },
    AlreadyHeld,
    InsufficientCapital,
}

/// Open a bracketed position sized from available cash.
pub fn enter_position(
    portfolio: &mut Portfolio,
    ticker: &str,
    direction: Direction,
    entry_price: f64,
    atr: f64,
    date: NaiveDate,
    strategy: &Strategy,
) -> EntryResult {
    if portfolio.has_position(ticker) {
        return EntryResult::AlreadyHeld;
    }

    let quantity = size_position(portfolio.cash, strategy.cash_at_risk, entry_price);
    if quantity == 0 {
        return EntryResult::InsufficientCapital;
    }

    let cost = quantity as f64 * entry_price;
    let (stop_loss, take_profit) = bracket_levels(direction, entry_price, atr, strategy);

    portfolio.cash -= cost;
    portfolio.add_position(Position {
        ticker: ticker.to_string(),
        quantity,
        entry_price,
        entry_date: date,
        direction,
        stop_loss,
        take_profit,
    });
    portfolio
        .ledger
        .record(date, TradeAction::Enter, ticker, quantity, entry_price);

    info!(
        %date, ticker, %direction, quantity, entry_price, stop_loss, take_profit,
        "position opened"
    );

    EntryResult::Entered {
        quantity,
        entry_price,
        stop_loss,
        take_profit,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Opened(EntryResult),
    AlreadyHeld,
    NotConfirmed { technical: TechnicalSignal },
    InsufficientCapital,
}

/// Full entry check for one ranked signal: hold check, technical veto,
/// open price, volatility and sizing.
///
/// Missing price data surfaces as a recoverable error for the caller to log.
pub fn evaluate_entry(
    portfolio: &mut Portfolio,
    prices: &PriceTable,
    signal: &Signal,
    date: NaiveDate,
    strategy: &Strategy,
) -> Result<EntryOutcome, SentitraderError> {
    let ticker = signal
        .primary_ticker()
        .ok_or_else(|| SentitraderError::InvalidSignal {
            value: format!("untagged headline {:?}", signal.title),
        })?;

    if portfolio.has_position(ticker) {
        return Ok(EntryOutcome::AlreadyHeld);
    }

    let history = prices.history_through(ticker, date);
    let technical = ma_crossover_signal(history, strategy.ma_windows);
    debug!(%date, ticker, sentiment = %signal.direction, %technical, "technical check");
    if !technical.confirms(signal.direction) {
        return Ok(EntryOutcome::NotConfirmed { technical });
    }

    let bar = prices.require_bar(ticker, date)?;
    let atr = latest_atr(history, strategy.atr_period).map_err(|_| SentitraderError::InsufficientData {
        ticker: ticker.to_string(),
        bars: history.len(),
        minimum: 1,
    })?;

    match enter_position(portfolio, ticker, signal.direction, bar.open, atr, date, strategy) {
        EntryResult::InsufficientCapital => Ok(EntryOutcome::InsufficientCapital),
        EntryResult::AlreadyHeld => Ok(EntryOutcome::AlreadyHeld),
        entered => Ok(EntryOutcome::Opened(entered)),
    }
}
