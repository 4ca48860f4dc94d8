// src/engines/metrics/engine.rs
use crate::engines::evaluation::BacktestReport;
use crate::engines::metrics::{ProfitabilityMetrics, RiskMetrics};
use serde::{Deserialize, Serialize};

/// Summary of one backtest, the input of the fitness function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// `(final_equity - starting_capital) / starting_capital`
    pub total_return: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub profit_factor: Option<f64>,
    pub num_trades: usize,
    pub constraint_violations: usize,
    pub final_equity: f64,
}

pub struct MetricsEngine;

impl MetricsEngine {
    pub fn calculate_all(report: &BacktestReport) -> PerformanceMetrics {
        let profit = ProfitabilityMetrics::calculate(&report.trades);
        let risk = RiskMetrics::calculate(&report.equity_curve, report.starting_capital);

        let total_return = if report.starting_capital > 0.0 {
            (report.final_equity - report.starting_capital) / report.starting_capital
        } else {
            0.0
        };

        PerformanceMetrics {
            total_return,
            max_drawdown: risk.max_drawdown,
            win_rate: profit.win_rate,
            sharpe_ratio: risk.sharpe_ratio,
            sortino_ratio: risk.sortino_ratio,
            profit_factor: profit.profit_factor,
            num_trades: report.trades.len(),
            constraint_violations: report.constraint_violations(),
            final_equity: report.final_equity,
        }
    }
}
