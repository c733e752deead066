//! Run statistics computed from the value series and closed round trips.

use super::portfolio::{Portfolio, PortfolioValueSample};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    /// Percent, e.g. `2.5` for +2.5%.
    pub total_return_pct: f64,
    /// ENTER rows in the ledger.
    pub entries: usize,
    pub round_trips: usize,
    pub open_positions: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_days: f64,
    /// Fraction of the running peak, e.g. `0.12` for a 12% drawdown.
    pub max_drawdown: f64,
    /// Longest stretch of consecutive samples below the running peak.
    pub max_drawdown_days: usize,
}

impl Metrics {
    pub fn compute(portfolio: &Portfolio) -> Self {
        let initial = portfolio.initial_capital;
        let final_value = portfolio.final_value();
        let total_return_pct = if initial > 0.0 {
            (final_value - initial) / initial * 100.0
        } else {
            0.0
        };

        let trades = &portfolio.closed_trades;
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut gross_win = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut holding_days = 0i64;

        for trade in trades {
            if trade.pnl > 0.0 {
                trades_won += 1;
                gross_win += trade.pnl;
                largest_win = largest_win.max(trade.pnl);
            } else if trade.pnl < 0.0 {
                trades_lost += 1;
                gross_loss += trade.pnl.abs();
                largest_loss = largest_loss.max(trade.pnl.abs());
            }
            holding_days += (trade.exit_date - trade.entry_date).num_days();
        }

        let round_trips = trades.len();
        let win_rate = if round_trips > 0 {
            trades_won as f64 / round_trips as f64
        } else {
            0.0
        };
        let profit_factor = if gross_loss > 0.0 {
            gross_win / gross_loss
        } else if gross_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        let avg_holding_days = if round_trips > 0 {
            holding_days as f64 / round_trips as f64
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_days) = drawdown(&portfolio.value_series);

        Metrics {
            final_value,
            total_return_pct,
            entries: portfolio.ledger.entry_count(),
            round_trips,
            open_positions: portfolio.position_count(),
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            largest_win,
            largest_loss,
            avg_holding_days,
            max_drawdown,
            max_drawdown_days,
        }
    }
}

fn drawdown(series: &[PortfolioValueSample]) -> (f64, usize) {
    let Some(first) = series.first() else {
        return (0.0, 0);
    };

    let mut peak = first.total_value;
    let mut max_dd = 0.0_f64;
    let mut run = 0usize;
    let mut longest = 0usize;

    for sample in series {
        if sample.total_value >= peak {
            peak = sample.total_value;
            run = 0;
            continue;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - sample.total_value) / peak);
        }
        run += 1;
        longest = longest.max(run);
    }

    (max_dd, longest)
}
