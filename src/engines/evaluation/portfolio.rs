use crate::{
    engines::risk::Order,
    error::{AetraderError, Result},
    types::{Direction, EquityPoint, ExitReason, GenomeId, Position, Trade},
};
use chrono::{DateTime, Utc};

/// Cash, the single open position and the trade log of one backtest run.
pub struct Portfolio {
    pub genome: GenomeId,
    pub initial_capital: f64,
    pub cash: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub fee_rate: f64,

    pub realized_pnl: f64,
    pub fees_paid: f64,
}

impl Portfolio {
    pub fn new(genome: GenomeId, initial_capital: f64, fee_rate: f64) -> Self {
        Self {
            genome,
            initial_capital,
            cash: initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            fee_rate,
            realized_pnl: 0.0,
            fees_paid: 0.0,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        self.position.as_ref().map(|p| p.direction)
    }

    /// Opens a position from a risk-sized order. A second open position for the same
    /// genome is a simulator fault.
    pub fn open_position(&mut self, bar: usize, time: DateTime<Utc>, order: &Order) -> Result<()> {
        if self.position.is_some() {
            return Err(AetraderError::Backtest(format!(
                "genome {} already holds a position at bar {}",
                self.genome, bar
            )));
        }

        match order.direction {
            Direction::Long => self.cash -= order.notional + order.fee,
            Direction::Short => self.cash += order.notional - order.fee,
        }
        self.fees_paid += order.fee;

        self.position = Some(Position {
            genome: self.genome,
            direction: order.direction,
            quantity: order.quantity,
            entry_price: order.price,
            entry_bar: bar,
            entry_time: time,
            entry_fee: order.fee,
        });

        Ok(())
    }

    pub fn close_position(
        &mut self,
        bar: usize,
        time: DateTime<Utc>,
        price: f64,
        reason: ExitReason,
    ) -> Option<&Trade> {
        let pos = self.position.take()?;
        let exit_notional = pos.quantity * price;
        let exit_fee = exit_notional * self.fee_rate;

        match pos.direction {
            Direction::Long => self.cash += exit_notional - exit_fee,
            Direction::Short => self.cash -= exit_notional + exit_fee,
        }

        let fees = pos.entry_fee + exit_fee;
        let profit = pos.unrealized_pnl(price) - fees;
        self.realized_pnl += profit;
        self.fees_paid += exit_fee;

        self.trades.push(Trade {
            genome: self.genome,
            direction: pos.direction,
            quantity: pos.quantity,
            entry_bar: pos.entry_bar,
            exit_bar: bar,
            entry_time: pos.entry_time,
            exit_time: time,
            entry_price: pos.entry_price,
            exit_price: price,
            profit,
            fees,
            exit_reason: reason,
        });
        self.trades.last()
    }

    /// Cash plus the open position valued at `price`
    pub fn equity(&self, price: f64) -> f64 {
        match &self.position {
            Some(pos) => match pos.direction {
                Direction::Long => self.cash + pos.quantity * price,
                Direction::Short => self.cash - pos.quantity * price,
            },
            None => self.cash,
        }
    }

    /// Appends the mark-to-market equity for the bar just processed
    pub fn mark(&mut self, time: DateTime<Utc>, price: f64) -> f64 {
        let equity = self.equity(price);
        self.equity_curve.push(EquityPoint { timestamp: time, equity });
        equity
    }

    pub fn get_trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn get_equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn final_balance(&self) -> f64 {
        self.cash
    }
}
