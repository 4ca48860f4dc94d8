use aetrader::config::{AppConfig, BacktestingConfig, ConfigManager, GapPolicy, RiskLimits};
use aetrader::data::{CachedSource, CsvSource, DataRequest, MarketDataSource, PriceSeries, SeriesOptions};
use aetrader::engines::evaluation::{Backtester, RuleStrategy};
use aetrader::engines::generation::Genome;
use aetrader::engines::risk::RiskManager;
use aetrader::execution::{LiveTrader, PaperExecutor};
use aetrader::types::{Candle, ExitReason, GenomeId};
use aetrader::AetraderError;
use chrono::{Duration, TimeZone, Utc};
use std::io::Write;

fn wave(bars: i64) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..bars)
        .map(|i| {
            let close = 150.0 + (i as f64 / 9.0).sin() * 8.0 + (i as f64 / 40.0).cos() * 5.0;
            let open = close + (i as f64 / 4.0).sin() * 0.6;
            Candle {
                timestamp: start + Duration::hours(i),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 500.0,
            }
        })
        .collect()
}

fn write_csv(path: &std::path::Path, candles: &[Candle]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
    for c in candles {
        writeln!(file, "{},{},{},{},{},{}", c.timestamp.timestamp(), c.open, c.high, c.low, c.close, c.volume)
            .unwrap();
    }
}

#[test]
fn test_environment_overrides_file_values() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[evolution]\npopulation_size = 30\nmax_generations = 4").unwrap();

    std::env::set_var("AETRADER__EVOLUTION__MAX_GENERATIONS", "9");
    let config = ConfigManager::new().with_file(file.path()).load();
    std::env::remove_var("AETRADER__EVOLUTION__MAX_GENERATIONS");

    let config = config.unwrap();
    assert_eq!(config.evolution.population_size, 30);
    assert_eq!(config.evolution.max_generations, 9);
}

#[test]
fn test_saved_config_loads_through_manager() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aetrader.toml");
    let mut config = AppConfig::default();
    config.data.symbol = "ETHUSD".to_string();
    config.risk = RiskLimits { max_position_size: 0.05, ..RiskLimits::default() };
    config.save_to_file(&path).unwrap();

    let loaded = ConfigManager::new().with_file(&path).without_env().load().unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_csv_gap_is_forward_filled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("GAPPY.csv");
    let mut candles = wave(10);
    candles.remove(4);
    candles.remove(4);
    write_csv(&path, &candles);

    let options = SeriesOptions {
        interval: Some(Duration::hours(1)),
        gap_policy: GapPolicy::ForwardFill,
    };
    let series = CsvSource::file(&path, options).fetch(&DataRequest::new("GAPPY", "1h")).unwrap();
    assert_eq!(series.len(), 10);
    assert_eq!(series.filled_bars(), 2);
    assert!((series.candles()[4].close - candles[3].close).abs() < 1e-9);
    assert_eq!(series.candles()[4].volume, 0.0);

    let strict = SeriesOptions { gap_policy: GapPolicy::Reject, ..options };
    assert!(matches!(
        CsvSource::file(&path, strict).fetch(&DataRequest::new("GAPPY", "1h")),
        Err(AetraderError::MalformedMarketData(_))
    ));
}

#[test]
fn test_cached_source_serves_repeat_requests() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(&dir.path().join("WAVE.csv"), &wave(40));
    let source = CachedSource::new(
        CsvSource::directory(dir.path(), SeriesOptions::default()),
        std::time::Duration::from_secs(60),
        4,
    );
    let request = DataRequest::new("WAVE", "1h");

    let first = source.fetch(&request).unwrap();
    std::fs::remove_file(dir.path().join("WAVE.csv")).unwrap();
    let second = source.fetch(&request).unwrap();

    assert_eq!(first.candles(), second.candles());
    assert_eq!(source.len(), 1);
    assert!(matches!(
        source.fetch(&DataRequest::new("OTHER", "1h")),
        Err(AetraderError::MarketDataUnavailable(_))
    ));
}

#[test]
fn test_live_trader_replays_backtest_trades() {
    let candles = wave(300);
    let series = PriceSeries::new("WAVE", candles.clone(), SeriesOptions::default()).unwrap();
    let genome = Genome::from_parts(GenomeId(11), vec![4.0, 18.0, 8.0, 40.0, 60.0, 0.0, 3.0, 1.0], 0, vec![])
        .unwrap();
    let limits = RiskLimits::default();

    let report = Backtester::new(BacktestingConfig::default())
        .run(&genome, &series, &limits, 10_000.0)
        .unwrap();
    let replayed: Vec<_> = report
        .trades
        .iter()
        .filter(|t| t.exit_reason != ExitReason::EndOfSeries)
        .collect();
    assert!(!replayed.is_empty());

    let mut trader = LiveTrader::new(
        "WAVE",
        genome.id(),
        Box::new(RuleStrategy::from_genome(&genome).unwrap()),
        RiskManager::new(limits.clone()),
        PaperExecutor::new(limits.trading_fee),
        10_000.0,
    );
    for bar in candles {
        trader.on_bar(bar).unwrap();
    }

    assert_eq!(trader.trades().len(), replayed.len());
    for (live, simulated) in trader.trades().iter().zip(replayed) {
        assert_eq!(live.direction, simulated.direction);
        assert_eq!(live.entry_time, simulated.entry_time);
        assert_eq!(live.exit_time, simulated.exit_time);
        assert_eq!(live.exit_reason, simulated.exit_reason);
        assert!((live.profit - simulated.profit).abs() < 1e-6);
    }
    assert_eq!(trader.rejections(), report.rejections);
}
