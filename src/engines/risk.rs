//! Pre-trade risk checks shared by the backtester and the live trader.
//!
//! Everything here is a pure function of its arguments and the `RiskLimits` the
//! manager was built with. It only ever looks at data up to "now".
use crate::config::RiskLimits;
use crate::types::{Candle, Direction, EquityPoint, ExitReason, Position};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A sized order the caller may execute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub direction: Direction,
    pub quantity: f64,
    pub price: f64,
    /// `quantity * price`
    pub notional: f64,
    /// Entry fee the caller will pay on top of the notional
    pub fee: f64,
}

/// Why the risk manager refused to size an order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rejection {
    NoCapital { available: f64 },
    InvalidPrice { price: f64 },
    BelowMinimumNotional { notional: f64, minimum: f64 },
    /// The daily-loss circuit breaker is tripped for this trading day
    Halted { day: NaiveDate },
}

/// Stop-loss or take-profit triggered inside a bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopHit {
    pub reason: ExitReason,
    pub price: f64,
}

/// Daily-loss circuit breaker trip. New entries stay suppressed until `day` ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Halt {
    pub day: NaiveDate,
    /// Loss since the start of `day`, in currency
    pub loss: f64,
    pub limit: f64,
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    limits: RiskLimits,
}

impl RiskManager {
    /// `limits` must already be validated.
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Sizes an entry so that notional plus entry fee fits inside
    /// `max_position_size * available_capital`.
    pub fn size_order(
        &self,
        direction: Direction,
        price: f64,
        available_capital: f64,
    ) -> Result<Order, Rejection> {
        if !(available_capital > 0.0) || !available_capital.is_finite() {
            return Err(Rejection::NoCapital { available: available_capital });
        }
        if !(price > 0.0) || !price.is_finite() {
            return Err(Rejection::InvalidPrice { price });
        }

        let budget = (self.limits.max_position_size * available_capital).min(available_capital);
        let notional = budget / (1.0 + self.limits.trading_fee);
        if notional < self.limits.min_order_notional || notional <= 0.0 {
            return Err(Rejection::BelowMinimumNotional {
                notional,
                minimum: self.limits.min_order_notional,
            });
        }

        Ok(Order {
            direction,
            quantity: notional / price,
            price,
            notional,
            fee: notional * self.limits.trading_fee,
        })
    }

    /// Same as `size_order`, but refuses while a halt covers `now`.
    pub fn size_entry(
        &self,
        direction: Direction,
        price: f64,
        available_capital: f64,
        halt: Option<&Halt>,
        now: DateTime<Utc>,
    ) -> Result<Order, Rejection> {
        if let Some(halt) = halt.filter(|h| h.day == now.date_naive()) {
            return Err(Rejection::Halted { day: halt.day });
        }
        self.size_order(direction, price, available_capital)
    }

    pub fn stop_price(&self, position: &Position) -> f64 {
        match position.direction {
            Direction::Long => position.entry_price * (1.0 - self.limits.stop_loss_pct),
            Direction::Short => position.entry_price * (1.0 + self.limits.stop_loss_pct),
        }
    }

    pub fn target_price(&self, position: &Position) -> f64 {
        match position.direction {
            Direction::Long => position.entry_price * (1.0 + self.limits.take_profit_pct),
            Direction::Short => position.entry_price * (1.0 - self.limits.take_profit_pct),
        }
    }

    /// Checks the bar's high/low against the stop and the target. When both are
    /// crossed within the same bar the stop wins. A bar that opens beyond a level
    /// fills at the open.
    pub fn check_stop(&self, position: &Position, bar: &Candle) -> Option<StopHit> {
        let stop = self.stop_price(position);
        let target = self.target_price(position);

        match position.direction {
            Direction::Long => {
                if bar.low <= stop {
                    Some(StopHit { reason: ExitReason::StopLoss, price: bar.open.min(stop) })
                } else if bar.high >= target {
                    Some(StopHit { reason: ExitReason::TakeProfit, price: bar.open.max(target) })
                } else {
                    None
                }
            }
            Direction::Short => {
                if bar.high >= stop {
                    Some(StopHit { reason: ExitReason::StopLoss, price: bar.open.max(stop) })
                } else if bar.low <= target {
                    Some(StopHit { reason: ExitReason::TakeProfit, price: bar.open.min(target) })
                } else {
                    None
                }
            }
        }
    }

    /// Trips when the loss since the start of the latest point's UTC day exceeds
    /// `max_daily_loss * starting_capital`. The day starts at the last equity point
    /// of an earlier day, or at `starting_capital` when there is none, so the first
    /// bar of a day (and a one-bar day) counts in full. Realized and unrealized P&L
    /// both count because the curve is marked to market.
    pub fn check_daily_loss(&self, equity_curve: &[EquityPoint], starting_capital: f64) -> Option<Halt> {
        let latest = equity_curve.last()?;
        let day = latest.timestamp.date_naive();
        let day_start = equity_curve
            .iter()
            .rev()
            .find(|p| p.timestamp.date_naive() < day)
            .map_or(starting_capital, |p| p.equity);

        let loss = day_start - latest.equity;
        let limit = self.limits.max_daily_loss * starting_capital;
        if loss > limit {
            Some(Halt { day, loss, limit })
        } else {
            None
        }
    }
}
