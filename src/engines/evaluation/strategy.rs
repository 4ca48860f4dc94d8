use super::indicators::{self, IndicatorRow, Indicators};
use crate::engines::generation::genome::{GeneDef, GeneSpec, Genome};
use crate::error::{AetraderError, Result};
use crate::types::{Candle, Direction, Signal};
use serde::{Deserialize, Serialize};

/// A trading rule evaluated once per bar over a bounded window of past candles.
/// The last candle of `window` is the current bar; nothing later is visible.
pub trait Strategy: Send + Sync {
    /// Number of bars the rule needs before it emits anything but `Hold`
    fn lookback(&self) -> usize;

    /// Indicator columns for `candles`, computed once before the bar loop.
    fn prepare(&self, _candles: &[Candle]) -> Result<Indicators> {
        Ok(Indicators::default())
    }

    /// `row` is the current bar's row of what `prepare` returned.
    fn signal(&self, window: &[Candle], row: IndicatorRow<'_>, position: Option<Direction>) -> Signal;
}

/// How the trend and mean-reversion conditions are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    TrendOnly,
    MeanReversionOnly,
    All,
    Any,
}

impl Combinator {
    const ALL: [Combinator; 4] = [
        Combinator::TrendOnly,
        Combinator::MeanReversionOnly,
        Combinator::All,
        Combinator::Any,
    ];

    fn combine(self, trend: bool, reversion: bool) -> bool {
        match self {
            Combinator::TrendOnly => trend,
            Combinator::MeanReversionOnly => reversion,
            Combinator::All => trend && reversion,
            Combinator::Any => trend || reversion,
        }
    }
}

const FAST_WINDOW: usize = 0;
const SLOW_WINDOW: usize = 1;
const RSI_WINDOW: usize = 2;
const RSI_OVERSOLD: usize = 3;
const RSI_OVERBOUGHT: usize = 4;
const TREND_THRESHOLD: usize = 5;
const COMBINATOR: usize = 6;
const ALLOW_SHORT: usize = 7;

const FAST_SMA: &str = "sma_fast";
const SLOW_SMA: &str = "sma_slow";
const RSI: &str = "rsi";

/// Gene layout decoded by `RuleStrategy`
pub fn default_gene_spec() -> Result<GeneSpec> {
    let genes = vec![
        GeneDef::integer("fast_window", 2, 50),
        GeneDef::integer("slow_window", 5, 200),
        GeneDef::integer("rsi_window", 2, 50),
        GeneDef::float("rsi_oversold", 10.0, 45.0),
        GeneDef::float("rsi_overbought", 55.0, 90.0),
        GeneDef::float("trend_threshold", 0.0, 0.05),
        GeneDef::choice("combinator", Combinator::ALL.len() as u32),
        GeneDef::choice("allow_short", 2),
    ];
    GeneSpec::new(genes)
}

/// Moving-average trend filter combined with an RSI mean-reversion trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStrategy {
    pub fast_window: usize,
    pub slow_window: usize,
    pub rsi_window: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub trend_threshold: f64,
    pub combinator: Combinator,
    pub allow_short: bool,
}

impl RuleStrategy {
    pub fn from_genome(genome: &Genome) -> Result<Self> {
        let genes = genome.genes();
        if genes.len() != ALLOW_SHORT + 1 || genes.iter().any(|g| !g.is_finite()) {
            return Err(AetraderError::InvalidGenome(format!(
                "genome {} cannot be decoded into a rule ({} genes)",
                genome.id(),
                genes.len()
            )));
        }

        let a = genes[FAST_WINDOW].max(1.0) as usize;
        let b = genes[SLOW_WINDOW].max(1.0) as usize;
        let (fast_window, mut slow_window) = (a.min(b), a.max(b));
        if slow_window == fast_window {
            slow_window += 1;
        }
        let combinator = Combinator::ALL[(genes[COMBINATOR].max(0.0) as usize).min(Combinator::ALL.len() - 1)];

        Ok(Self {
            fast_window,
            slow_window,
            rsi_window: genes[RSI_WINDOW].max(2.0) as usize,
            rsi_oversold: genes[RSI_OVERSOLD],
            rsi_overbought: genes[RSI_OVERBOUGHT],
            trend_threshold: genes[TREND_THRESHOLD].max(0.0),
            combinator,
            allow_short: genes[ALLOW_SHORT] >= 1.0,
        })
    }
}

impl Strategy for RuleStrategy {
    fn lookback(&self) -> usize {
        self.slow_window.max(self.rsi_window + 1)
    }

    fn prepare(&self, candles: &[Candle]) -> Result<Indicators> {
        Indicators::compute(
            candles,
            vec![
                indicators::sma(self.fast_window, FAST_SMA),
                indicators::sma(self.slow_window, SLOW_SMA),
                indicators::rsi(self.rsi_window, RSI),
            ],
        )
    }

    fn signal(&self, window: &[Candle], row: IndicatorRow<'_>, position: Option<Direction>) -> Signal {
        if window.len() < self.lookback() {
            return Signal::Hold;
        }
        let (Some(fast), Some(slow), Some(rsi)) = (row.get(FAST_SMA), row.get(SLOW_SMA), row.get(RSI)) else {
            return Signal::Hold;
        };

        let trend_up = fast > slow * (1.0 + self.trend_threshold);
        let trend_down = fast < slow * (1.0 - self.trend_threshold);
        let oversold = rsi < self.rsi_oversold;
        let overbought = rsi > self.rsi_overbought;

        let go_long = self.combinator.combine(trend_up, oversold);
        let go_short = self.combinator.combine(trend_down, overbought);

        match position {
            None if go_long => Signal::EnterLong,
            None if go_short && self.allow_short => Signal::EnterShort,
            Some(Direction::Long) if go_short => {
                if self.allow_short {
                    Signal::EnterShort
                } else {
                    Signal::Exit
                }
            }
            Some(Direction::Short) if go_long => Signal::EnterLong,
            _ => Signal::Hold,
        }
    }
}
