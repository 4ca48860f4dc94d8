use crate::{
    config::{BacktestingConfig, RiskLimits},
    data::PriceSeries,
    engines::{
        evaluation::{Portfolio, RuleStrategy, Strategy},
        generation::Genome,
        risk::{Halt, RiskManager},
    },
    error::{AetraderError, Result},
    types::{Candle, Direction, EquityPoint, ExitReason, GenomeId, Signal, Trade},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Everything one backtest run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub genome: GenomeId,
    pub starting_capital: f64,
    pub final_equity: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Entry signals the risk manager refused, halted days included
    pub rejections: usize,
    /// Daily-loss circuit breaker trips
    pub halts: usize,
    pub bars: usize,
}

impl BacktestReport {
    pub fn constraint_violations(&self) -> usize {
        self.rejections + self.halts
    }
}

pub struct Backtester {
    config: BacktestingConfig,
}

impl Backtester {
    pub fn new(config: BacktestingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestingConfig {
        &self.config
    }

    /// Decodes `genome` into a `RuleStrategy` and simulates it over `series`.
    pub fn run(
        &self,
        genome: &Genome,
        series: &PriceSeries,
        limits: &RiskLimits,
        starting_capital: f64,
    ) -> Result<BacktestReport> {
        let strategy = RuleStrategy::from_genome(genome)?;
        let risk = RiskManager::new(limits.clone());
        self.run_strategy(&strategy, genome.id(), series, &risk, starting_capital)
    }

    /// Bar loop. Per bar: stops, mark-to-market and daily-loss check, signal, exits,
    /// then risk-sized entries. Fills happen at the bar's close except stops.
    pub fn run_strategy(
        &self,
        strategy: &dyn Strategy,
        genome: GenomeId,
        series: &PriceSeries,
        risk: &RiskManager,
        starting_capital: f64,
    ) -> Result<BacktestReport> {
        let lookback = strategy.lookback().max(1);
        if lookback > self.config.max_lookback {
            return Err(AetraderError::InvalidGenome(format!(
                "genome {} needs {} bars of history, limit is {}",
                genome, lookback, self.config.max_lookback
            )));
        }

        let started = Instant::now();
        let timeout = self.config.evaluation_timeout();
        let candles = series.candles();
        let indicators = strategy.prepare(candles)?;
        let mut portfolio = Portfolio::new(genome, starting_capital, risk.limits().trading_fee);
        let mut halt: Option<Halt> = None;
        let mut rejections = 0;
        let mut halts = 0;

        for (i, bar) in candles.iter().enumerate() {
            if let Some(limit) = timeout {
                if started.elapsed() > limit {
                    return Err(AetraderError::EvaluationTimeout {
                        genome: genome.to_string(),
                        limit_ms: limit.as_millis(),
                    });
                }
            }

            if let Some(hit) = portfolio.position.as_ref().and_then(|p| risk.check_stop(p, bar)) {
                portfolio.close_position(i, bar.timestamp, hit.price, hit.reason);
            }

            portfolio.mark(bar.timestamp, bar.close);
            if let Some(tripped) = risk.check_daily_loss(portfolio.get_equity_curve(), starting_capital) {
                if halt.map_or(true, |h| h.day != tripped.day) {
                    log::debug!(
                        "genome {}: daily loss {:.2} over limit {:.2} on {}, entries halted",
                        genome, tripped.loss, tripped.limit, tripped.day
                    );
                    halts += 1;
                    halt = Some(tripped);
                }
            }

            let window = &candles[(i + 1).saturating_sub(lookback)..=i];
            let held = portfolio.direction();
            let signal = strategy.signal(window, indicators.row(i), held);

            let entry = match (signal, held) {
                (Signal::Hold, _) => None,
                (Signal::Exit, Some(_)) => {
                    portfolio.close_position(i, bar.timestamp, bar.close, ExitReason::SignalReversal);
                    None
                }
                (Signal::Exit, None) => None,
                (_, Some(current)) if signal.entry_direction() == Some(current) => None,
                (_, Some(_)) => {
                    portfolio.close_position(i, bar.timestamp, bar.close, ExitReason::SignalReversal);
                    signal.entry_direction()
                }
                (_, None) => signal.entry_direction(),
            };

            if let Some(direction) = entry {
                self.enter(&mut portfolio, risk, direction, i, bar, halt.as_ref(), &mut rejections)?;
            }
        }

        if let Some(last) = candles.last() {
            if portfolio.position.is_some() {
                portfolio.close_position(candles.len() - 1, last.timestamp, last.close, ExitReason::EndOfSeries);
                let cash = portfolio.cash;
                if let Some(point) = portfolio.equity_curve.last_mut() {
                    point.equity = cash;
                }
            }
        }

        log::debug!(
            "genome {}: {} trades, final equity {:.2}, {} rejections, {} halts",
            genome,
            portfolio.trades.len(),
            portfolio.cash,
            rejections,
            halts
        );

        Ok(BacktestReport {
            genome,
            starting_capital,
            final_equity: portfolio.final_balance(),
            trades: portfolio.trades,
            equity_curve: portfolio.equity_curve,
            rejections,
            halts,
            bars: candles.len(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn enter(
        &self,
        portfolio: &mut Portfolio,
        risk: &RiskManager,
        direction: Direction,
        bar_index: usize,
        bar: &Candle,
        halt: Option<&Halt>,
        rejections: &mut usize,
    ) -> Result<()> {
        match risk.size_entry(direction, bar.close, portfolio.cash, halt, bar.timestamp) {
            Ok(order) => portfolio.open_position(bar_index, bar.timestamp, &order),
            Err(rejection) => {
                log::debug!("genome {}: entry at bar {} rejected: {:?}", portfolio.genome, bar_index, rejection);
                *rejections += 1;
                Ok(())
            }
        }
    }
}
