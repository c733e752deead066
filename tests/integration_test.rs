//! End-to-end tests of the daily simulation, the live cycle planner and
//! the invariants that must hold for any price path.

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use sentitrader::adapters::csv_adapter::load_price_table;
use sentitrader::adapters::file_report::{FileReportAdapter, LEDGER_FILE, SUMMARY_FILE, VALUE_FILE};
use sentitrader::domain::backtest::{run_backtest, BacktestConfig, BacktestResult, SkipReason};
use sentitrader::domain::error::SentitraderError;
use sentitrader::domain::execution::{enter_position, EntryResult};
use sentitrader::domain::ledger::TradeAction;
use sentitrader::domain::live::{
    plan_cycle, AccountSnapshot, CycleSkip, LiveConfig, RawHeadline, SeenHeadlines,
};
use sentitrader::domain::metrics::Metrics;
use sentitrader::domain::news::{NewsItem, Sentiment};
use sentitrader::domain::portfolio::Portfolio;
use sentitrader::domain::price_table::PriceTable;
use sentitrader::domain::signal::{rank_signals, Direction, Signal};
use sentitrader::domain::strategy::{ExitPriority, Strategy};
use sentitrader::domain::technical::TechnicalSignal;
use sentitrader::ports::news_port::NewsPort;
use sentitrader::ports::report_port::ReportPort;
use std::collections::HashMap;

fn run(prices: &PriceTable, news: &[NewsItem], config: &BacktestConfig) -> BacktestResult {
    run_backtest(prices, news, config).unwrap()
}

mod long_round_trip {
    use super::*;

    fn result() -> BacktestResult {
        let prices = PriceTable::from_bars(rising_bars("AAPL", 20));
        let news = vec![headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95)];
        run(&prices, &news, &quick_config(Some(day(20))))
    }

    #[test]
    fn enters_at_open_with_atr_brackets() {
        let result = result();
        let entry = &result.portfolio.ledger.entries()[0];
        assert_eq!(entry.action, TradeAction::Enter);
        assert_eq!(entry.date, day(10));
        // round(5000 / 110) = 45
        assert_eq!(entry.quantity, 45);
        assert_relative_eq!(entry.price, 110.0);
    }

    #[test]
    fn exits_at_take_profit_level() {
        let result = result();
        let exit = &result.portfolio.ledger.entries()[1];
        // target 110 + 4×2 = 118, first reached by day 17's high
        assert_eq!(exit.action, TradeAction::ExitTakeProfit);
        assert_eq!(exit.date, day(17));
        assert_relative_eq!(exit.price, 118.0);
        assert!(result.portfolio.positions.is_empty());
    }

    #[test]
    fn value_series_and_summary() {
        let result = result();
        let series = &result.portfolio.value_series;
        assert_eq!(series.len(), 11);
        assert_eq!(series[0].date, day(10));
        assert_relative_eq!(series[0].total_value, 100_000.0);
        // 45 × 110 escrowed on day 10, released at 118 on day 17
        assert_relative_eq!(series[0].cash, 95_050.0, epsilon = 1e-6);
        assert_relative_eq!(series[6].cash, 95_050.0, epsilon = 1e-6);
        assert_relative_eq!(series[7].cash, 100_360.0, epsilon = 1e-6);

        let summary = result.summary();
        assert_relative_eq!(summary.final_value, 100_360.0, epsilon = 1e-6);
        assert_relative_eq!(summary.total_return_pct, 0.36, epsilon = 1e-9);
        assert_eq!(summary.trade_count, 1);
    }
}

mod short_round_trip {
    use super::*;

    #[test]
    fn negative_news_on_downtrend_shorts_and_covers() {
        let prices = PriceTable::from_bars(falling_bars("TSLA", 20));
        let news = vec![headline(10, "Tesla recall", &["TSLA"], Sentiment::Negative, 0.97)];
        let result = run(&prices, &news, &quick_config(Some(day(20))));

        let entries = result.portfolio.ledger.entries();
        assert_eq!(entries.len(), 2);
        // round(5000 / 190) = 26, stop 194, target 182
        assert_eq!(entries[0].quantity, 26);
        assert_eq!(entries[1].action, TradeAction::ExitTakeProfit);
        assert_eq!(entries[1].date, day(17));
        assert_relative_eq!(entries[1].price, 182.0);

        // day 12 mark at close 188: 95060 + 26 × (380 − 188)
        assert_relative_eq!(result.portfolio.value_series[2].total_value, 100_052.0, epsilon = 1e-6);
        assert_relative_eq!(result.portfolio.cash, 100_208.0, epsilon = 1e-6);
        assert_relative_eq!(result.portfolio.closed_trades[0].pnl, 208.0, epsilon = 1e-6);
    }
}

mod exit_priority {
    use super::*;

    fn prices_with_wide_day_11() -> PriceTable {
        let mut bars = rising_bars("AAPL", 15);
        bars[10] = make_bar("AAPL", day(11), 111.0, 200.0, 1.0, 111.0);
        PriceTable::from_bars(bars)
    }

    fn run_with(priority: ExitPriority) -> BacktestResult {
        let news = vec![headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95)];
        let mut config = quick_config(Some(day(12)));
        config.strategy.exit_priority = priority;
        run(&prices_with_wide_day_11(), &news, &config)
    }

    #[test]
    fn take_profit_first_by_default() {
        let result = run_with(ExitPriority::TakeProfitFirst);
        let exit = &result.portfolio.ledger.entries()[1];
        assert_eq!(exit.action, TradeAction::ExitTakeProfit);
        assert_relative_eq!(exit.price, 118.0);
    }

    #[test]
    fn stop_loss_first_when_configured() {
        let result = run_with(ExitPriority::StopLossFirst);
        let exit = &result.portfolio.ledger.entries()[1];
        assert_eq!(exit.action, TradeAction::ExitStopLoss);
        assert_relative_eq!(exit.price, 106.0);
        // 95050 + 45 × 106
        assert_relative_eq!(result.portfolio.cash, 99_820.0, epsilon = 1e-6);
    }
}

mod signal_handling {
    use super::*;

    #[test]
    fn second_signal_for_held_ticker_is_skipped() {
        let prices = PriceTable::from_bars(rising_bars("AAPL", 15));
        let news = vec![
            headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95),
            headline(11, "Apple raises guidance", &["AAPL"], Sentiment::Positive, 0.99),
        ];
        let result = run(&prices, &news, &quick_config(None));

        assert_eq!(result.portfolio.ledger.entry_count(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].date, day(11));
        assert_eq!(result.skipped[0].reason, SkipReason::AlreadyHeld);
    }

    #[test]
    fn below_threshold_and_neutral_are_ignored() {
        let prices = PriceTable::from_bars(rising_bars("AAPL", 15));
        let news = vec![
            headline(10, "Apple maybe", &["AAPL"], Sentiment::Positive, 0.89),
            headline(10, "Apple flat", &["AAPL"], Sentiment::Neutral, 0.99),
        ];
        let result = run(&prices, &news, &quick_config(None));
        assert!(result.portfolio.ledger.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let prices = PriceTable::from_bars(rising_bars("AAPL", 15));
        let news = vec![headline(10, "Apple exactly", &["AAPL"], Sentiment::Positive, 0.90)];
        let result = run(&prices, &news, &quick_config(None));
        assert_eq!(result.portfolio.ledger.entry_count(), 1);
    }

    #[test]
    fn technical_disagreement_vetoes() {
        let prices = PriceTable::from_bars(falling_bars("AAPL", 15));
        let news = vec![headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.99)];
        let result = run(&prices, &news, &quick_config(None));

        assert!(result.portfolio.ledger.is_empty());
        assert_eq!(
            result.skipped[0].reason,
            SkipReason::NotConfirmed {
                technical: TechnicalSignal::Sell
            }
        );
    }

    #[test]
    fn highest_confidence_wins_the_day() {
        let mut bars = rising_bars("AAPL", 15);
        bars.extend(rising_bars("MSFT", 15));
        let prices = PriceTable::from_bars(bars);
        let news = vec![
            headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.92),
            headline(10, "Microsoft beats", &["MSFT"], Sentiment::Positive, 0.97),
        ];
        let result = run(&prices, &news, &quick_config(None));

        assert_eq!(result.portfolio.ledger.entry_count(), 1);
        assert_eq!(result.portfolio.ledger.entries()[0].ticker, "MSFT");
    }

    #[test]
    fn ties_keep_input_order() {
        let mut bars = rising_bars("AAPL", 15);
        bars.extend(rising_bars("MSFT", 15));
        let prices = PriceTable::from_bars(bars);
        let news = vec![
            headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95),
            headline(10, "Microsoft beats", &["MSFT"], Sentiment::Positive, 0.95),
        ];
        let result = run(&prices, &news, &quick_config(None));
        assert_eq!(result.portfolio.ledger.entries()[0].ticker, "AAPL");
    }

    #[test]
    fn only_primary_ticker_is_traded() {
        let mut bars = rising_bars("MSFT", 15);
        bars.extend(rising_bars("GOOGL", 15));
        let prices = PriceTable::from_bars(bars);
        let news = vec![headline(
            10,
            "Microsoft and Google rally",
            &["MSFT", "GOOGL"],
            Sentiment::Positive,
            0.96,
        )];
        let result = run(&prices, &news, &quick_config(None));

        assert_eq!(result.portfolio.position_count(), 1);
        assert!(result.portfolio.has_position("MSFT"));
    }

    #[test]
    fn missing_bar_on_signal_day_is_skipped() {
        let bars: Vec<_> = rising_bars("AAPL", 15)
            .into_iter()
            .filter(|b| b.date != day(10))
            .collect();
        let prices = PriceTable::from_bars(bars);
        let news = vec![
            headline(9, "Apple quiet", &["AAPL"], Sentiment::Neutral, 0.99),
            headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95),
        ];
        let result = run(&prices, &news, &quick_config(None));

        assert!(result.portfolio.ledger.is_empty());
        assert!(matches!(result.skipped[0].reason, SkipReason::MissingData { .. }));
        assert_eq!(result.portfolio.value_series.len(), 2);
    }

    #[test]
    fn weekend_days_are_valued_from_last_close() {
        let bars: Vec<_> = rising_bars("AAPL", 15)
            .into_iter()
            .filter(|b| b.date != day(12) && b.date != day(13))
            .collect();
        let prices = PriceTable::from_bars(bars);
        let news = vec![
            headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95),
            headline(13, "Apple quiet", &["AAPL"], Sentiment::Neutral, 0.99),
        ];
        let result = run(&prices, &news, &quick_config(None));

        let series = &result.portfolio.value_series;
        assert_eq!(series.len(), 4);
        // days 12 and 13 have no bar: both mark at day 11's close
        assert_relative_eq!(series[2].total_value, series[1].total_value);
        assert_relative_eq!(series[3].total_value, series[1].total_value);
    }
}

mod fatal_inputs {
    use super::*;

    #[test]
    fn empty_price_table_aborts() {
        let news = vec![headline(1, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95)];
        let err = run_backtest(&PriceTable::new(), &news, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, SentitraderError::InputMissing { .. }));
    }

    #[test]
    fn empty_news_aborts() {
        let prices = PriceTable::from_bars(rising_bars("AAPL", 5));
        let err = run_backtest(&prices, &[], &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, SentitraderError::InputMissing { .. }));
    }
}

mod ports_and_reports {
    use super::*;

    #[test]
    fn price_table_from_mock_port_skips_failing_tickers() {
        let port = MockPricePort::new()
            .with_bars("AAPL", rising_bars("AAPL", 10))
            .with_error("MSFT", "connection reset");
        let tickers = vec!["AAPL".to_string(), "MSFT".to_string()];
        let table = load_price_table(&port, &tickers, day(1), day(31));
        assert_eq!(table.tickers(), vec!["AAPL"]);
    }

    #[test]
    fn pipeline_from_ports_to_report_files() {
        let port = MockPricePort::new().with_bars("AAPL", rising_bars("AAPL", 20));
        let news_port = MockNewsPort {
            items: vec![headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95)],
        };
        let tickers = vec!["AAPL".to_string()];
        let prices = load_price_table(&port, &tickers, day(1), day(31));
        let news = news_port.fetch_news().unwrap();
        let result = run(&prices, &news, &quick_config(Some(day(20))));

        let dir = tempfile::TempDir::new().unwrap();
        FileReportAdapter::new()
            .write(&result, dir.path().to_str().unwrap())
            .unwrap();

        let ledger = std::fs::read_to_string(dir.path().join(LEDGER_FILE)).unwrap();
        assert_eq!(ledger.lines().count(), 3);
        let values = std::fs::read_to_string(dir.path().join(VALUE_FILE)).unwrap();
        assert_eq!(values.lines().count(), 12);
        let summary = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("Total Trades Made:   1"));
    }

    #[test]
    fn metrics_after_round_trip() {
        let prices = PriceTable::from_bars(rising_bars("AAPL", 20));
        let news = vec![headline(10, "Apple beats", &["AAPL"], Sentiment::Positive, 0.95)];
        let result = run(&prices, &news, &quick_config(Some(day(20))));
        let metrics = Metrics::compute(&result.portfolio);

        assert_eq!(metrics.entries, 1);
        assert_eq!(metrics.round_trips, 1);
        assert_eq!(metrics.trades_won, 1);
        assert_relative_eq!(metrics.win_rate, 1.0);
        assert_eq!(metrics.avg_holding_days, 7.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }
}

mod live_cycle {
    use super::*;

    fn raw(id: &str, title: &str, tickers: &[&str]) -> RawHeadline {
        RawHeadline {
            id: id.to_string(),
            title: title.to_string(),
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn account() -> AccountSnapshot {
        AccountSnapshot {
            portfolio_value: 50_000.0,
            position_values: HashMap::new(),
        }
    }

    #[test]
    fn consecutive_cycles_do_not_repeat_work() {
        let prices = PriceTable::from_bars(rising_bars("NVDA", 10));
        let classifier = MockSentiment::new().answer("Nvidia soars", Sentiment::Positive, 0.9);
        let batch = vec![raw("a", "Nvidia soars", &["NVDA"]), raw("b", "Rates steady", &[])];
        let now = day(10).and_hms_opt(16, 0, 0).unwrap();
        let config = LiveConfig::default();

        let first = plan_cycle(
            &config,
            &account(),
            &batch,
            &classifier,
            &prices,
            now,
            SeenHeadlines::with_capacity(100),
        );
        let order = first.order.unwrap();
        assert_eq!(order.ticker, "NVDA");
        assert_eq!(order.direction, Direction::Buy);
        // round(2500 / 110) = 23
        assert_eq!(order.quantity, 23);
        assert_eq!(first.seen.len(), 2);
        // untagged headline never reaches the classifier
        assert_eq!(classifier.batches.borrow()[0], vec!["Nvidia soars".to_string()]);

        let second = plan_cycle(&config, &account(), &batch, &classifier, &prices, now, first.seen);
        assert_eq!(second.skip, Some(CycleSkip::NoNewHeadlines));
        assert_eq!(classifier.batches.borrow().len(), 1);
    }

    #[test]
    fn evicted_ids_are_processed_again() {
        let prices = PriceTable::from_bars(rising_bars("NVDA", 10));
        let classifier = MockSentiment::new();
        let now = day(10).and_hms_opt(16, 0, 0).unwrap();
        let config = LiveConfig::default();

        let mut seen = SeenHeadlines::with_capacity(1);
        for id in ["a", "b"] {
            let batch = vec![raw(id, id, &["NVDA"])];
            seen = plan_cycle(&config, &account(), &batch, &classifier, &prices, now, seen).seen;
        }
        assert!(!seen.contains("a"));
        assert!(seen.contains("b"));

        let batch = vec![raw("a", "a", &["NVDA"])];
        let again = plan_cycle(&config, &account(), &batch, &classifier, &prices, now, seen);
        assert_eq!(again.skip, Some(CycleSkip::NoSignal));
        assert_eq!(classifier.batches.borrow().len(), 3);
    }
}

fn ledger_alternates(result: &BacktestResult) -> bool {
    let mut open: HashMap<&str, bool> = HashMap::new();
    for entry in result.portfolio.ledger.entries() {
        let is_open = open.entry(entry.ticker.as_str()).or_insert(false);
        match entry.action {
            TradeAction::Enter if *is_open => return false,
            TradeAction::Enter => *is_open = true,
            _ if !*is_open => return false,
            _ => *is_open = false,
        }
    }
    open.iter()
        .all(|(ticker, is_open)| *is_open == result.portfolio.has_position(ticker))
}

fn random_walk(ticker: &str, steps: &[f64]) -> Vec<OhlcvBar> {
    let mut price = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            price += step;
            make_bar(ticker, day(i as u32 + 1), price, price + 1.5, price - 1.5, price)
        })
        .collect()
}

proptest! {
    #[test]
    fn portfolio_invariants_hold_for_any_path(
        steps_a in prop::collection::vec(-3.0f64..3.0, 30),
        steps_b in prop::collection::vec(-3.0f64..3.0, 30),
        events in prop::collection::vec((1u32..=30, any::<bool>(), any::<bool>(), 0.85f64..1.0), 1..20),
        cash_at_risk in 0.05f64..1.0,
        stop_first in any::<bool>(),
    ) {
        let mut bars = random_walk("AAA", &steps_a);
        bars.extend(random_walk("BBB", &steps_b));
        let prices = PriceTable::from_bars(bars);

        let news: Vec<NewsItem> = events
            .iter()
            .enumerate()
            .map(|(i, (d, first, positive, conf))| {
                let ticker = if *first { "AAA" } else { "BBB" };
                let sentiment = if *positive { Sentiment::Positive } else { Sentiment::Negative };
                headline(*d, &format!("headline {i}"), &[ticker], sentiment, *conf)
            })
            .collect();

        let mut config = quick_config(Some(day(30)));
        config.start_date = Some(day(1));
        config.strategy.cash_at_risk = cash_at_risk;
        if stop_first {
            config.strategy.exit_priority = ExitPriority::StopLossFirst;
        }
        let result = run_backtest(&prices, &news, &config).unwrap();

        prop_assert!(result.portfolio.cash >= -1e-6);
        for sample in &result.portfolio.value_series {
            prop_assert!(sample.cash >= -1e-6, "cash {} on {}", sample.cash, sample.date);
            prop_assert!(sample.total_value >= -1e-6);
        }
        prop_assert_eq!(result.portfolio.value_series.len(), 30);
        prop_assert!(result.portfolio.position_count() <= 2);
        prop_assert!(ledger_alternates(&result));
        prop_assert_eq!(
            result.portfolio.ledger.entries().iter().filter(|e| e.action.is_exit()).count(),
            result.portfolio.closed_trades.len()
        );
    }

    #[test]
    fn ranking_is_descending_and_stable(confidences in prop::collection::vec(prop::sample::select(vec![0.9, 0.95, 1.0]), 0..25)) {
        let signals: Vec<Signal> = confidences
            .iter()
            .enumerate()
            .map(|(i, &confidence)| Signal {
                tickers: vec!["X".into()],
                direction: Direction::Buy,
                confidence,
                title: i.to_string(),
            })
            .collect();
        let ranked = rank_signals(signals);

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].confidence >= pair[1].confidence);
            if pair[0].confidence == pair[1].confidence {
                let a: usize = pair[0].title.parse().unwrap();
                let b: usize = pair[1].title.parse().unwrap();
                prop_assert!(a < b);
            }
        }
    }

    #[test]
    fn entry_preserves_value_at_entry_price(
        cash in 1_000.0f64..1_000_000.0,
        price in 1.0f64..500.0,
        atr in 0.1f64..10.0,
        long in any::<bool>(),
    ) {
        let mut portfolio = Portfolio::new(cash);
        let direction = if long { Direction::Buy } else { Direction::Sell };
        let outcome = enter_position(&mut portfolio, "X", direction, price, atr, day(1), &Strategy::default());

        prop_assert!(portfolio.cash >= -1e-6);
        if let EntryResult::Entered { .. } = outcome {
            let marks = HashMap::from([("X".to_string(), price)]);
            let value = portfolio.total_value(&marks);
            prop_assert!((value - cash).abs() < 1e-6 * cash.max(1.0));
            // valuation does not mutate anything
            prop_assert_eq!(portfolio.total_value(&marks), value);
        }
    }
}
