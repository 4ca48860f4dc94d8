// src/engines/metrics/profitability.rs
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Trade-level statistics. Ratios are fractions, not percents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityMetrics {
    pub total_profit: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    /// Gross profit over gross loss; `None` when nothing was lost
    pub profit_factor: Option<f64>,
}

impl ProfitabilityMetrics {
    pub fn calculate(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let (winning, losing): (Vec<&Trade>, Vec<&Trade>) = trades.iter().partition(|t| t.profit > 0.0);

        let gross_profit: f64 = winning.iter().map(|t| t.profit).sum();
        let gross_loss: f64 = losing.iter().map(|t| t.profit.abs()).sum();

        let avg_win = if winning.is_empty() { 0.0 } else { gross_profit / winning.len() as f64 };
        let avg_loss = if losing.is_empty() { 0.0 } else { gross_loss / losing.len() as f64 };

        Self {
            total_profit: gross_profit - gross_loss,
            win_rate: winning.len() as f64 / trades.len() as f64,
            avg_win,
            avg_loss,
            profit_factor: (gross_loss > 0.0).then(|| gross_profit / gross_loss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trade(profit: f64) -> Trade {
        Trade {
            genome: GenomeId(1),
            direction: Direction::Long,
            quantity: 1.0,
            entry_bar: 0,
            exit_bar: 1,
            entry_time: Utc::now(),
            exit_time: Utc::now(),
            entry_price: 100.0,
            exit_price: 100.0 + profit,
            profit,
            fees: 0.0,
            exit_reason: ExitReason::SignalReversal,
        }
    }

    #[test]
    fn empty_trades_are_all_zero() {
        assert_eq!(ProfitabilityMetrics::calculate(&[]), ProfitabilityMetrics::default());
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let m = ProfitabilityMetrics::calculate(&[trade(30.0), trade(-10.0), trade(10.0), trade(-10.0)]);
        assert_eq!(m.win_rate, 0.5);
        assert_eq!(m.total_profit, 20.0);
        assert_eq!(m.avg_win, 20.0);
        assert_eq!(m.avg_loss, 10.0);
        assert_eq!(m.profit_factor, Some(2.0));
    }

    #[test]
    fn no_losses_has_no_profit_factor() {
        let m = ProfitabilityMetrics::calculate(&[trade(5.0)]);
        assert_eq!(m.profit_factor, None);
        assert_eq!(m.win_rate, 1.0);
    }
}
