use aetrader::config::{BacktestingConfig, RiskLimits};
use aetrader::data::{PriceSeries, SeriesOptions};
use aetrader::engines::evaluation::{Backtester, Combinator, IndicatorRow, RuleStrategy, Strategy};
use aetrader::engines::risk::RiskManager;
use aetrader::types::{Candle, Direction, ExitReason, GenomeId, Signal};
use chrono::{Duration, TimeZone, Utc};

fn candle(hour: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hour),
        open,
        high,
        low,
        close,
        volume: 100.0,
    }
}

fn series(candles: Vec<Candle>) -> PriceSeries {
    PriceSeries::new("TEST", candles, SeriesOptions::default()).unwrap()
}

/// Goes long on the first bar at or after `from`, never exits by itself
struct LongFrom {
    from: usize,
}

impl Strategy for LongFrom {
    fn lookback(&self) -> usize {
        self.from + 1
    }

    fn signal(&self, window: &[Candle], _row: IndicatorRow<'_>, position: Option<Direction>) -> Signal {
        if position.is_none() && window.len() > self.from {
            Signal::EnterLong
        } else {
            Signal::Hold
        }
    }
}

#[test]
fn test_stop_loss_hit_at_bar_six() {
    // Entry at bar 3 close of 100 with a 2% stop at 98; bar 6 trades down to 97.9
    let candles = vec![
        candle(0, 100.0, 100.5, 99.5, 100.0),
        candle(1, 100.0, 100.5, 99.5, 100.0),
        candle(2, 100.0, 100.5, 99.5, 100.0),
        candle(3, 100.0, 100.5, 99.5, 100.0),
        candle(4, 100.0, 101.0, 99.0, 100.2),
        candle(5, 100.2, 100.8, 98.6, 99.0),
        candle(6, 99.0, 99.2, 97.9, 98.5),
        candle(7, 98.5, 99.0, 98.1, 98.8),
    ];
    let risk = RiskManager::new(RiskLimits { trading_fee: 0.0, ..RiskLimits::default() });
    let report = Backtester::new(BacktestingConfig::default())
        .run_strategy(&LongFrom { from: 3 }, GenomeId(7), &series(candles), &risk, 10000.0)
        .unwrap();

    let first = &report.trades[0];
    assert_eq!(first.entry_bar, 3);
    assert_eq!(first.exit_bar, 6);
    assert_eq!(first.exit_reason, ExitReason::StopLoss);
    assert!((first.exit_price - 98.0).abs() < 1e-9);
}

#[test]
fn test_stop_loss_with_fees_loses_two_percent_plus_both_legs() {
    let candles = vec![
        candle(0, 100.0, 100.5, 99.5, 100.0),
        candle(1, 100.0, 100.5, 99.5, 100.0),
        candle(2, 100.0, 100.5, 99.5, 100.0),
        candle(3, 100.0, 100.5, 99.5, 100.0),
        candle(4, 100.0, 101.0, 99.0, 100.2),
        candle(5, 100.2, 100.8, 98.6, 99.0),
        candle(6, 99.0, 99.2, 97.9, 98.5),
    ];
    let limits = RiskLimits::default();
    let fee = limits.trading_fee;
    assert!(fee > 0.0);
    let report = Backtester::new(BacktestingConfig::default())
        .run_strategy(&LongFrom { from: 3 }, GenomeId(7), &series(candles), &RiskManager::new(limits), 10000.0)
        .unwrap();

    let trade = &report.trades[0];
    assert_eq!(trade.exit_bar, 6);
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert!(trade.fees > 0.0);
    // Entry fee on the entry notional, exit fee on 98% of it
    let expected = -0.02 - fee * (1.0 + 0.98);
    assert!((trade.return_pct() - expected).abs() < 1e-9, "{}", trade.return_pct());
}

#[test]
fn test_daily_bars_trip_the_breaker_from_previous_close() {
    let limits = RiskLimits {
        max_position_size: 1.0,
        stop_loss_pct: 0.2,
        take_profit_pct: 0.3,
        trading_fee: 0.0,
        ..RiskLimits::default()
    };
    let candles = [100.0, 94.0, 100.0, 94.0]
        .iter()
        .enumerate()
        .map(|(day, &close)| candle(24 * day as i64, close, close, close, close))
        .collect();

    /// Long whenever flat
    struct Flip;
    impl Strategy for Flip {
        fn lookback(&self) -> usize {
            1
        }
        fn signal(&self, _window: &[Candle], _row: IndicatorRow<'_>, position: Option<Direction>) -> Signal {
            if position.is_none() {
                Signal::EnterLong
            } else {
                Signal::Hold
            }
        }
    }

    let report = Backtester::new(BacktestingConfig::default())
        .run_strategy(&Flip, GenomeId(10), &series(candles), &RiskManager::new(limits), 10000.0)
        .unwrap();

    // Day 1 and day 3 each close 6% under the previous day
    assert_eq!(report.halts, 2);
    assert_eq!(report.trades.len(), 1);
}

#[test]
fn test_daily_loss_halt_suppresses_entries_until_next_day() {
    // Full-size position: a 3.5% intraday drop in price is a 3.5% loss of capital
    let limits = RiskLimits {
        max_position_size: 1.0,
        stop_loss_pct: 0.2,
        take_profit_pct: 0.2,
        trading_fee: 0.0,
        ..RiskLimits::default()
    };
    let candles = vec![
        candle(0, 100.0, 100.0, 100.0, 100.0),
        candle(1, 100.0, 100.0, 96.5, 96.5),
        candle(2, 96.5, 97.0, 96.0, 97.0),
        candle(24, 97.0, 97.5, 96.8, 97.2),
    ];

    /// Long on bar 0, flat on bar 1, then wants back in on every bar
    struct FlipFlop;
    impl Strategy for FlipFlop {
        fn lookback(&self) -> usize {
            1
        }
        fn signal(&self, window: &[Candle], _row: IndicatorRow<'_>, position: Option<Direction>) -> Signal {
            let hour = window[window.len() - 1].timestamp.format("%H").to_string();
            match (hour.as_str(), position) {
                ("01", Some(_)) => Signal::Exit,
                (_, None) => Signal::EnterLong,
                _ => Signal::Hold,
            }
        }
    }

    let report = Backtester::new(BacktestingConfig::default())
        .run_strategy(&FlipFlop, GenomeId(8), &series(candles), &RiskManager::new(limits), 10000.0)
        .unwrap();

    // Bar 1 trips the breaker (loss 350 > 300); bar 2's entry is refused
    assert_eq!(report.halts, 1);
    assert_eq!(report.rejections, 1);
    assert_eq!(report.trades.len(), 2);
    assert_eq!(report.trades[0].exit_bar, 1);
    // The next UTC day trades again
    assert_eq!(report.trades[1].entry_bar, 3);
}

#[test]
fn test_flat_market_never_trades() {
    let candles = (0..120).map(|h| candle(h, 50.0, 50.0, 50.0, 50.0)).collect();
    let rule = RuleStrategy {
        fast_window: 5,
        slow_window: 20,
        rsi_window: 14,
        rsi_oversold: 30.0,
        rsi_overbought: 70.0,
        trend_threshold: 0.0,
        combinator: Combinator::Any,
        allow_short: true,
    };
    let report = Backtester::new(BacktestingConfig::default())
        .run_strategy(
            &rule,
            GenomeId(9),
            &series(candles),
            &RiskManager::new(RiskLimits::default()),
            10000.0,
        )
        .unwrap();

    assert!(report.trades.is_empty());
    assert_eq!(report.final_equity, 10000.0);
    assert_eq!(report.equity_curve.len(), 120);
}
