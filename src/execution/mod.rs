//! Order execution for the champion strategy.
//!
//! `LiveTrader` replays the backtester's per-bar sequence on bars as they arrive and
//! routes every order through the same `RiskManager`. Broker adapters implement
//! `OrderExecutor`; `PaperExecutor` fills at the requested price.
use crate::engines::evaluation::{Portfolio, Strategy};
use crate::engines::risk::{Halt, Order, RiskManager};
use crate::error::{AetraderError, Result};
use crate::types::{Candle, Direction, ExitReason, GenomeId, Position, Signal, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: f64,
    pub price: f64,
    /// Closes an existing position instead of opening one
    pub reduce_only: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub request: OrderRequest,
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
}

pub trait OrderExecutor: Send {
    fn submit(&mut self, request: &OrderRequest) -> Result<Fill>;
}

/// Simulated broker. Fills every request in full at the requested price.
#[derive(Debug, Default)]
pub struct PaperExecutor {
    fee_rate: f64,
    fills: Vec<Fill>,
}

impl PaperExecutor {
    pub fn new(fee_rate: f64) -> Self {
        Self { fee_rate, fills: Vec::new() }
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }
}

impl OrderExecutor for PaperExecutor {
    fn submit(&mut self, request: &OrderRequest) -> Result<Fill> {
        if !(request.quantity > 0.0) || !(request.price > 0.0) {
            return Err(AetraderError::Execution(format!(
                "cannot fill {} {} @ {}",
                request.quantity, request.symbol, request.price
            )));
        }
        let fill = Fill {
            request: request.clone(),
            price: request.price,
            quantity: request.quantity,
            fee: request.quantity * request.price * self.fee_rate,
        };
        self.fills.push(fill.clone());
        Ok(fill)
    }
}

/// Drives one strategy against incoming bars
pub struct LiveTrader<E: OrderExecutor> {
    symbol: String,
    strategy: Box<dyn Strategy>,
    risk: RiskManager,
    executor: E,
    portfolio: Portfolio,
    window: VecDeque<Candle>,
    halt: Option<Halt>,
    bars_seen: usize,
    rejections: usize,
    fills: Vec<Fill>,
}

impl<E: OrderExecutor> LiveTrader<E> {
    pub fn new(
        symbol: impl Into<String>,
        genome: GenomeId,
        strategy: Box<dyn Strategy>,
        risk: RiskManager,
        executor: E,
        starting_capital: f64,
    ) -> Self {
        let fee_rate = risk.limits().trading_fee;
        Self {
            symbol: symbol.into(),
            strategy,
            risk,
            executor,
            portfolio: Portfolio::new(genome, starting_capital, fee_rate),
            window: VecDeque::new(),
            halt: None,
            bars_seen: 0,
            rejections: 0,
            fills: Vec::new(),
        }
    }

    /// Processes a closed bar and returns the fills it produced. On error, fills
    /// already made for this bar are still in `fills()`.
    pub fn on_bar(&mut self, bar: Candle) -> Result<Vec<Fill>> {
        if !bar.is_well_formed() {
            return Err(AetraderError::MalformedMarketData(format!(
                "{}: malformed bar at {}",
                self.symbol, bar.timestamp
            )));
        }
        if self.window.back().is_some_and(|prev| bar.timestamp <= prev.timestamp) {
            return Err(AetraderError::MalformedMarketData(format!(
                "{}: bar at {} is not after the previous one",
                self.symbol, bar.timestamp
            )));
        }

        let index = self.bars_seen;
        self.bars_seen += 1;
        self.window.push_back(bar);
        while self.window.len() > self.strategy.lookback().max(1) {
            self.window.pop_front();
        }

        let mut fills = Vec::new();

        if let Some(hit) = self.portfolio.position.as_ref().and_then(|p| self.risk.check_stop(p, &bar)) {
            fills.push(self.close(index, &bar, hit.price, hit.reason)?);
        }

        self.mark(&bar);

        let held = self.portfolio.direction();
        let window = self.window.make_contiguous();
        let indicators = self.strategy.prepare(window)?;
        let signal = self.strategy.signal(window, indicators.row(window.len() - 1), held);

        let entry = match (signal, held) {
            (Signal::Hold, _) | (Signal::Exit, None) => None,
            (Signal::Exit, Some(_)) => {
                fills.push(self.close(index, &bar, bar.close, ExitReason::SignalReversal)?);
                None
            }
            (_, Some(current)) if signal.entry_direction() == Some(current) => None,
            (_, Some(_)) => {
                fills.push(self.close(index, &bar, bar.close, ExitReason::SignalReversal)?);
                signal.entry_direction()
            }
            (_, None) => signal.entry_direction(),
        };

        if let Some(direction) = entry {
            match self.risk.size_entry(direction, bar.close, self.portfolio.cash, self.halt.as_ref(), bar.timestamp) {
                Ok(order) => match self.open(index, &bar, order) {
                    Ok(fill) => fills.push(fill),
                    Err(e) => {
                        if !fills.is_empty() {
                            log::warn!(
                                "{}: {:?} entry failed after {} fill(s) on this bar: {}",
                                self.symbol, direction, fills.len(), e
                            );
                        }
                        return Err(e);
                    }
                },
                Err(rejection) => {
                    log::info!("{}: {:?} entry rejected: {:?}", self.symbol, direction, rejection);
                    self.rejections += 1;
                }
            }
        }

        Ok(fills)
    }

    fn mark(&mut self, bar: &Candle) {
        // The daily check needs today's points plus the last one before today
        let day = bar.timestamp.date_naive();
        let curve = &mut self.portfolio.equity_curve;
        if let Some(previous_day) = curve.iter().rposition(|p| p.timestamp.date_naive() < day) {
            curve.drain(..previous_day);
        }
        self.portfolio.mark(bar.timestamp, bar.close);

        let starting_capital = self.portfolio.initial_capital;
        if let Some(tripped) = self.risk.check_daily_loss(self.portfolio.get_equity_curve(), starting_capital) {
            if self.halt.map_or(true, |h| h.day != tripped.day) {
                log::warn!(
                    "{}: daily loss {:.2} exceeds {:.2}, no new entries until {} ends",
                    self.symbol, tripped.loss, tripped.limit, tripped.day
                );
                self.halt = Some(tripped);
            }
        }
    }

    fn open(&mut self, index: usize, bar: &Candle, order: Order) -> Result<Fill> {
        let request = OrderRequest {
            symbol: self.symbol.clone(),
            direction: order.direction,
            quantity: order.quantity,
            price: order.price,
            reduce_only: false,
            timestamp: bar.timestamp,
        };
        let fill = self.executor.submit(&request)?;
        let filled = Order {
            quantity: fill.quantity,
            price: fill.price,
            notional: fill.quantity * fill.price,
            fee: fill.fee,
            ..order
        };
        self.fills.push(fill.clone());
        self.portfolio.open_position(index, bar.timestamp, &filled)?;
        log::info!("{}: opened {:?} {:.6} @ {:.4}", self.symbol, filled.direction, filled.quantity, filled.price);
        Ok(fill)
    }

    fn close(&mut self, index: usize, bar: &Candle, price: f64, reason: ExitReason) -> Result<Fill> {
        let position = self
            .portfolio
            .position
            .as_ref()
            .ok_or_else(|| AetraderError::Execution(format!("{}: no position to close", self.symbol)))?;
        let request = OrderRequest {
            symbol: self.symbol.clone(),
            direction: position.direction.opposite(),
            quantity: position.quantity,
            price,
            reduce_only: true,
            timestamp: bar.timestamp,
        };
        let fill = self.executor.submit(&request)?;
        self.fills.push(fill.clone());
        if let Some(trade) = self.portfolio.close_position(index, bar.timestamp, fill.price, reason) {
            log::info!("{}: closed {:?} ({:?}), profit {:.2}", self.symbol, trade.direction, reason, trade.profit);
        }
        Ok(fill)
    }

    pub fn position(&self) -> Option<&Position> {
        self.portfolio.position.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        self.portfolio.get_trades()
    }

    pub fn equity(&self) -> f64 {
        self.window.back().map_or(self.portfolio.cash, |bar| self.portfolio.equity(bar.close))
    }

    pub fn halt(&self) -> Option<&Halt> {
        self.halt.as_ref()
    }

    pub fn rejections(&self) -> usize {
        self.rejections
    }

    /// Every fill since the trader started
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}
