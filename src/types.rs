use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a genome. Two genomes with identical genes are still distinct
/// individuals when their ids differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenomeId(pub u64);

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Checks finiteness and the OHLC ordering `low <= open,close <= high`.
    pub fn is_well_formed(&self) -> bool {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
            && self.volume >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalReversal,
    EndOfSeries,
}

/// Output of a strategy rule for one bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    EnterLong,
    EnterShort,
    Exit,
    Hold,
}

impl Signal {
    pub fn entry_direction(self) -> Option<Direction> {
        match self {
            Signal::EnterLong => Some(Direction::Long),
            Signal::EnterShort => Some(Direction::Short),
            _ => None,
        }
    }
}

/// An open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub genome: GenomeId,
    pub direction: Direction,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_fee: f64,
}

impl Position {
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.direction {
            Direction::Long => (price - self.entry_price) * self.quantity,
            Direction::Short => (self.entry_price - price) * self.quantity,
        }
    }
}

/// Trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub genome: GenomeId,
    pub direction: Direction,
    pub quantity: f64,
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net of both legs' fees
    pub profit: f64,
    pub fees: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Net return relative to the entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity;
        if notional > 0.0 {
            self.profit / notional
        } else {
            0.0
        }
    }
}

/// Mark-to-market equity after a bar has been processed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}
