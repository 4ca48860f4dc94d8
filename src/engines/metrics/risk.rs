// src/engines/metrics/risk.rs
use crate::types::EquityPoint;
use serde::{Deserialize, Serialize};

/// Equity-curve statistics. Drawdown is a fraction of the running peak.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub max_drawdown: f64,
    pub volatility: f64,
    /// Mean over standard deviation of bar returns, risk-free rate zero
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
}

impl RiskMetrics {
    /// `initial_balance` seeds the running peak, so a curve that only ever falls
    /// still shows its drawdown from the start.
    pub fn calculate(equity_curve: &[EquityPoint], initial_balance: f64) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let mut metrics = Self { max_drawdown: Self::max_drawdown(&equity, initial_balance), ..Self::default() };

        if equity.len() < 2 {
            return metrics;
        }

        let returns = Self::calculate_returns(&equity);
        let avg_return = returns.iter().sum::<f64>() / returns.len() as f64;
        metrics.volatility = Self::std_dev(&returns);
        if metrics.volatility > 0.0 {
            metrics.sharpe_ratio = avg_return / metrics.volatility;
        }

        let downside: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
        let downside_dev = Self::std_dev(&downside);
        if downside_dev > 0.0 {
            metrics.sortino_ratio = avg_return / downside_dev;
        }

        metrics
    }

    fn max_drawdown(equity: &[f64], initial_balance: f64) -> f64 {
        let mut max_dd: f64 = 0.0;
        let mut peak = initial_balance;

        for &value in equity {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                max_dd = max_dd.max((peak - value) / peak);
            }
        }

        max_dd
    }

    fn calculate_returns(equity: &[f64]) -> Vec<f64> {
        equity
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }

    fn std_dev(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

        variance.sqrt()
    }
}
